//! Question/answer history and last-chart state, persisted across restarts.
//!
//! Four fixed keys in durable storage. An answer and the chart it produced are
//! committed together; the chart type is written on its own, so a display
//! preference outlives any one answer.

use crate::chart::{ChartPayload, ChartPoint, ChartType};
use crate::db::Storage;
use crate::error::RetroResult;
use crate::logging;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const HISTORY_KEY: &str = "retro.qa_history";
pub const CHART_DATA_KEY: &str = "retro.chart_data";
pub const CHART_TITLE_KEY: &str = "retro.chart_title";
pub const CHART_TYPE_KEY: &str = "retro.chart_type";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QAEntry {
    pub question: String,
    pub answer: String,
}

/// Owned application state, reloaded from storage at startup.
///
/// `version` increments on every change so a render layer can tell when to redraw.
pub struct DashboardState {
    storage: Storage,
    history: VecDeque<QAEntry>,
    history_limit: Option<usize>,
    chart: Option<ChartPayload>,
    chart_type: ChartType,
    version: u64,
}

impl DashboardState {
    /// Reload everything from storage. Missing or unreadable entries start empty.
    pub fn load(storage: Storage, history_limit: Option<usize>) -> RetroResult<Self> {
        let mut history: VecDeque<QAEntry> = read_json(&storage, HISTORY_KEY)?.unwrap_or_default();
        if let Some(limit) = history_limit {
            history.truncate(limit);
        }

        let series: Option<Vec<ChartPoint>> = read_json(&storage, CHART_DATA_KEY)?;
        let title = storage.get(CHART_TITLE_KEY)?;
        let chart = match (series, title) {
            (None, None) => None,
            (series, title) => Some(ChartPayload {
                title: title.unwrap_or_default(),
                series: series.unwrap_or_default(),
            }),
        };

        let chart_type = storage
            .get(CHART_TYPE_KEY)?
            .and_then(|raw| ChartType::from_str(&raw))
            .unwrap_or_default();

        logging::log_storage(&format!(
            "Restored {} history entries, chart: {}, type: {}",
            history.len(),
            chart.as_ref().map(|c| c.title.as_str()).unwrap_or("none"),
            chart_type.as_str()
        ));

        Ok(Self {
            storage,
            history,
            history_limit,
            chart,
            chart_type,
            version: 0,
        })
    }

    /// Most recent first
    pub fn history(&self) -> impl Iterator<Item = &QAEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn chart(&self) -> Option<&ChartPayload> {
        self.chart.as_ref()
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Prepend an answered question and persist the whole log
    pub fn record_answer(&mut self, question: &str, answer: &str) -> RetroResult<()> {
        self.record_exchange(question, answer, None)
    }

    /// Persist one answered question, plus its chart if it produced one, in a
    /// single transaction. Memory is only updated once the write commits.
    pub fn record_exchange(
        &mut self,
        question: &str,
        answer: &str,
        chart: Option<ChartPayload>,
    ) -> RetroResult<()> {
        let mut history = self.history.clone();
        history.push_front(QAEntry {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        if let Some(limit) = self.history_limit {
            history.truncate(limit);
        }

        let history_json = serde_json::to_string(&history)?;
        match &chart {
            Some(payload) => {
                let series = serde_json::to_string(&payload.series)?;
                self.storage.set_many(&[
                    (HISTORY_KEY, history_json.as_str()),
                    (CHART_DATA_KEY, series.as_str()),
                    (CHART_TITLE_KEY, payload.title.as_str()),
                ])?;
                logging::log_storage(&format!(
                    "Chart '{}' stored with {} points",
                    payload.title,
                    payload.series.len()
                ));
            }
            None => self.storage.set(HISTORY_KEY, &history_json)?,
        }

        self.history = history;
        if chart.is_some() {
            self.chart = chart;
        }
        self.version += 1;
        Ok(())
    }

    /// Replace the stored chart entirely
    pub fn record_chart(&mut self, payload: ChartPayload) -> RetroResult<()> {
        let series = serde_json::to_string(&payload.series)?;
        self.storage.set_many(&[
            (CHART_DATA_KEY, series.as_str()),
            (CHART_TITLE_KEY, payload.title.as_str()),
        ])?;

        logging::log_storage(&format!(
            "Chart '{}' stored with {} points",
            payload.title,
            payload.series.len()
        ));
        self.chart = Some(payload);
        self.version += 1;
        Ok(())
    }

    pub fn record_chart_type(&mut self, chart_type: ChartType) -> RetroResult<()> {
        self.storage.set(CHART_TYPE_KEY, chart_type.as_str())?;
        self.chart_type = chart_type;
        self.version += 1;
        Ok(())
    }

    /// Hand the storage back (e.g. to reload it as a fresh state)
    pub fn into_storage(self) -> Storage {
        self.storage
    }
}

fn read_json<T: serde::de::DeserializeOwned>(storage: &Storage, key: &str) -> RetroResult<Option<T>> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            logging::log_error(None, &format!("Ignoring unreadable '{}': {}", key, e));
            Ok(None)
        }
    }
}
