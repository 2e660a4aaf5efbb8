use crate::chart::{build_distribution, ChartPayload, ChartPoint, ChartType};
use crate::completion::CompletionProvider;
use crate::dataset::{CategoryDataset, CategoryRecordset};
use crate::error::{RetroError, RetroResult};
use crate::interpret::{interpret, InterpretedAnswer};
use crate::logging;
use crate::prompt::build_prompt;
use crate::state::{DashboardState, QAEntry};
use crate::store::CategoryStoreClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

/// Result of one answered question
#[derive(Debug, Clone, PartialEq)]
pub struct AskOutcome {
    pub answer: InterpretedAnswer,
    pub display: String,
}

#[derive(Default)]
struct LoadedData {
    dataset: CategoryDataset,
    recordset: CategoryRecordset,
    loaded: bool,
}

/// Clears the busy flag when the in-flight question finishes, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Ties the pipeline together: store -> prompt -> completion -> interpret -> state.
///
/// Failures never touch previously loaded data, history or chart.
pub struct RetroAssistant {
    store: CategoryStoreClient,
    provider: Box<dyn CompletionProvider>,
    state: Mutex<DashboardState>,
    data: RwLock<LoadedData>,
    busy: AtomicBool,
}

impl RetroAssistant {
    pub fn new(
        store: CategoryStoreClient,
        provider: Box<dyn CompletionProvider>,
        state: DashboardState,
    ) -> Self {
        Self {
            store,
            provider,
            state: Mutex::new(state),
            data: RwLock::new(LoadedData::default()),
            busy: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        // A panic mid-write cannot leave the state half-updated in a way we care about.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============ Dataset ============

    /// Fetch both dataset shapes from one store read. An empty result (soft
    /// failure) keeps whatever was loaded before.
    pub async fn refresh_dataset(&self) -> usize {
        let (dataset, recordset) = self.store.fetch_snapshot().await;

        if dataset.is_empty() && recordset.is_empty() && self.is_dataset_loaded() {
            logging::log_dataset("Store returned no data; keeping previous dataset");
            return self.read_data(|d| d.dataset.len());
        }

        self.apply_dataset(dataset, recordset)
    }

    /// Replace the loaded dataset. Returns the number of categories.
    pub fn apply_dataset(&self, dataset: CategoryDataset, recordset: CategoryRecordset) -> usize {
        let count = dataset.len();
        let mut data = self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *data = LoadedData {
            dataset,
            recordset,
            loaded: true,
        };
        count
    }

    fn read_data<T>(&self, f: impl FnOnce(&LoadedData) -> T) -> T {
        let data = self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&*data)
    }

    pub fn is_dataset_loaded(&self) -> bool {
        self.read_data(|d| d.loaded)
    }

    pub fn dataset(&self) -> CategoryDataset {
        self.read_data(|d| d.dataset.clone())
    }

    /// Category -> item count chart, independent of the AI pipeline
    pub fn distribution(&self) -> Vec<ChartPoint> {
        self.read_data(|d| build_distribution(&d.dataset))
    }

    // ============ Questions ============

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Answer one question. Only one may be in flight at a time.
    pub async fn ask(&self, question: &str) -> RetroResult<AskOutcome> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(RetroError::Busy)?;

        let (recordset, loaded) = self.read_data(|d| (d.recordset.clone(), d.loaded));
        if !loaded {
            logging::log_prompt(Some(question), "Dataset not loaded yet; asking with an empty summary");
        }

        let prompt = build_prompt(&recordset, question)?;

        let raw = match self.provider.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                logging::log_error(Some(question), &format!("Question failed: {}", e));
                return Err(e);
            }
        };

        let answer = interpret(&raw);
        let display = answer.display_text();
        logging::log_interpret(Some(question), &format!("Answer classified as {}", answer.kind()));

        let chart = match &answer {
            InterpretedAnswer::ChartResult(chart) => Some(chart.clone()),
            _ => None,
        };
        self.state().record_exchange(question, &display, chart)?;

        Ok(AskOutcome { answer, display })
    }

    // ============ Persisted view state ============

    pub fn history(&self) -> Vec<QAEntry> {
        self.state().history().cloned().collect()
    }

    pub fn chart(&self) -> Option<ChartPayload> {
        self.state().chart().cloned()
    }

    pub fn chart_type(&self) -> ChartType {
        self.state().chart_type()
    }

    pub fn select_chart_type(&self, chart_type: ChartType) -> RetroResult<()> {
        self.state().record_chart_type(chart_type)
    }

    // ============ Data manager ============

    pub async fn fetch_categories(&self) -> RetroResult<Vec<String>> {
        self.store.fetch_categories().await
    }

    pub async fn save_category(&self, category: &str, items: &[String]) -> RetroResult<()> {
        self.store.save_category(category, items).await?;
        self.refresh_dataset().await;
        Ok(())
    }

    pub async fn add_category(&self, category: &str) -> RetroResult<()> {
        self.store.add_category(category).await?;
        self.refresh_dataset().await;
        Ok(())
    }

    pub async fn upload_csv(&self, category: &str, file_name: &str, contents: Vec<u8>) -> RetroResult<usize> {
        let rows = self.store.upload_csv(category, file_name, contents).await?;
        self.refresh_dataset().await;
        Ok(rows.len())
    }
}
