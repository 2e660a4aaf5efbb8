//! HTTP client for the retrospective data store.
//!
//! Reads fail softly: the dashboard treats an empty dataset as "no data", so
//! transport and shape problems are logged and collapse to an empty mapping.
//! Writes (data manager) report their errors to the caller.

use crate::csv_import::parse_csv;
use crate::dataset::{
    self, revert_category_name, format_category_name, CategoryDataset, CategoryItem,
    CategoryRecordset, Categorized, PLACEHOLDER_ITEM,
};
use crate::error::{RetroError, RetroResult};
use crate::logging;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct CategoryUpdate<'a> {
    values: &'a [String],
}

pub struct CategoryStoreClient {
    client: Client,
    base_url: String,
    upload_url: String,
}

impl CategoryStoreClient {
    pub fn new(base_url: &str, upload_url: &str) -> Self {
        Self::with_client(Client::new(), base_url, upload_url)
    }

    pub fn with_client(client: Client, base_url: &str, upload_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.to_string(),
        }
    }

    pub fn category_url(&self, category: &str) -> String {
        format!("{}/{}", self.base_url, revert_category_name(category))
    }

    async fn fetch_document(&self) -> RetroResult<Value> {
        let response = self.client.get(&self.base_url).send().await?;
        let response = ensure_success(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| RetroError::MalformedResponse(e.to_string()))
    }

    /// The raw store document, or `None` (logged) on transport failure
    async fn fetch_document_soft(&self) -> Option<Value> {
        match self.fetch_document().await {
            Ok(raw) => Some(raw),
            Err(e) => {
                logging::log_error(None, &format!("Dataset fetch failed: {}", e));
                None
            }
        }
    }

    /// Category -> display strings. Empty on any failure.
    pub async fn fetch_display_dataset(&self) -> CategoryDataset {
        match self.fetch_document_soft().await {
            Some(raw) => normalize_soft(&raw, "display", dataset::normalize_display),
            None => CategoryDataset::new(),
        }
    }

    /// Category -> attribute records. Empty on any failure.
    pub async fn fetch_recordset(&self) -> CategoryRecordset {
        match self.fetch_document_soft().await {
            Some(raw) => normalize_soft(&raw, "records", dataset::normalize_recordset),
            None => CategoryRecordset::new(),
        }
    }

    /// Both shapes from a single read, so they describe the same store state
    pub async fn fetch_snapshot(&self) -> (CategoryDataset, CategoryRecordset) {
        match self.fetch_document_soft().await {
            Some(raw) => (
                normalize_soft(&raw, "display", dataset::normalize_display),
                normalize_soft(&raw, "records", dataset::normalize_recordset),
            ),
            None => (CategoryDataset::new(), CategoryRecordset::new()),
        }
    }

    /// Category keys known to the store, formatted for display
    pub async fn fetch_categories(&self) -> RetroResult<Vec<String>> {
        let url = format!("{}/categories", self.base_url);
        let response = ensure_success(self.client.get(&url).send().await?).await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| RetroError::MalformedResponse(e.to_string()))?;

        categories_from_value(&raw)
    }

    /// Replace one category's items
    pub async fn save_category(&self, category: &str, items: &[String]) -> RetroResult<Value> {
        let url = self.category_url(category);
        logging::log_dataset(&format!("Saving {} items to {}", items.len(), url));

        let response = self
            .client
            .put(&url)
            .json(&CategoryUpdate { values: items })
            .send()
            .await?;
        let response = ensure_success(response).await?;
        read_optional_json(response).await
    }

    /// Create a category seeded with the "no data" placeholder
    pub async fn add_category(&self, category: &str) -> RetroResult<Value> {
        self.save_category(category, &[PLACEHOLDER_ITEM.to_string()]).await
    }

    /// Validate a CSV file locally, then append its rows to `category`.
    ///
    /// Returns the rows that were sent. An insufficient file never reaches the network.
    pub async fn upload_csv(
        &self,
        category: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> RetroResult<Vec<String>> {
        let rows = parse_csv(&String::from_utf8_lossy(&contents))?;

        let file = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new()
            .part("file", file)
            .text("category", revert_category_name(category));

        logging::log_dataset(&format!(
            "Uploading {} CSV rows from {} into {}",
            rows.len(),
            file_name,
            category
        ));

        let response = self.client.post(&self.upload_url).multipart(form).send().await?;
        ensure_success(response).await?;

        Ok(rows)
    }
}

fn normalize_soft<T, F>(raw: &Value, shape: &str, normalize: F) -> Categorized<T>
where
    T: CategoryItem,
    F: Fn(&Value) -> RetroResult<Categorized<T>>,
{
    match normalize(raw) {
        Ok(data) => {
            logging::log_dataset(&format!("Loaded {} categories ({} view)", data.len(), shape));
            data
        }
        Err(e) => {
            logging::log_error(None, &format!("Unusable dataset ({} view): {}", shape, e));
            Categorized::new()
        }
    }
}

async fn ensure_success(response: Response) -> RetroResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RetroError::Transport(format!(
        "store request failed ({}): {}",
        status,
        body.chars().take(200).collect::<String>()
    )))
}

async fn read_optional_json(response: Response) -> RetroResult<Value> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| RetroError::MalformedResponse(e.to_string()))
}

fn categories_from_value(raw: &Value) -> RetroResult<Vec<String>> {
    let keys = raw.as_array().ok_or_else(|| {
        RetroError::MalformedResponse("category list is not an array".to_string())
    })?;

    Ok(keys
        .iter()
        .filter_map(Value::as_str)
        .filter(|key| *key != dataset::IDENTITY_KEY)
        .map(format_category_name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_urls_use_storage_keys() {
        let store = CategoryStoreClient::new(
            "http://localhost:5000/api/retro-data/",
            "http://localhost:5000/api/upload-csv",
        );
        assert_eq!(
            store.category_url("Lo Que Gusto"),
            "http://localhost:5000/api/retro-data/LoQueGusto"
        );
    }

    #[test]
    fn category_list_is_formatted() {
        let raw = json!(["_id", "loQueGusto", "mantener", 7]);
        assert_eq!(
            categories_from_value(&raw).unwrap(),
            vec!["Lo Que Gusto".to_string(), "Mantener".to_string()]
        );
        assert!(categories_from_value(&json!({"a": 1})).is_err());
    }

    #[test]
    fn update_body_wraps_values() {
        let items = vec!["a | b".to_string()];
        let body = serde_json::to_value(CategoryUpdate { values: &items }).unwrap();
        assert_eq!(body, json!({"values": ["a | b"]}));
    }

    #[tokio::test]
    async fn insufficient_csv_fails_before_network() {
        // Nothing listens on port 9; reaching the network would yield Transport instead.
        let store = CategoryStoreClient::new("http://127.0.0.1:9/api", "http://127.0.0.1:9/upload");
        let result = store
            .upload_csv("Lo Que Gusto", "retro.csv", b"solo,cabecera\n".to_vec())
            .await;
        assert!(matches!(result, Err(RetroError::InsufficientCsv)));
    }

    #[tokio::test]
    async fn unreachable_store_reads_as_empty() {
        let store = CategoryStoreClient::new("http://127.0.0.1:9/api", "http://127.0.0.1:9/upload");
        assert!(store.fetch_display_dataset().await.is_empty());
        assert!(store.fetch_recordset().await.is_empty());
    }

    // ============ Wire exchanges ============

    use crate::test_support::{direct_client, serve, StubResponse};

    fn store_at(base: &str) -> CategoryStoreClient {
        CategoryStoreClient::with_client(
            direct_client(),
            &format!("{}/api/retro-data", base),
            &format!("{}/api/upload-csv", base),
        )
    }

    #[tokio::test]
    async fn snapshot_normalizes_one_get() {
        let (base, requests) = serve(vec![StubResponse::json(
            200,
            json!([{"_id": "retroSummary_001", "loQueGusto": ["pairing", {"autor": "Ana", "detalle": "demos"}], "loQueFalto": []}]),
        )])
        .await;

        let (dataset, recordset) = store_at(&base).fetch_snapshot().await;

        assert_eq!(
            dataset.get("loQueGusto").unwrap(),
            &["pairing".to_string(), "Ana | demos".to_string()]
        );
        assert_eq!(recordset.get("loQueGusto").unwrap()[1].get("autor").map(String::as_str), Some("Ana"));
        assert_eq!(dataset.len(), 2);

        let requests = requests.await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].request_line, "GET /api/retro-data HTTP/1.1");
    }

    #[tokio::test]
    async fn server_error_reads_as_empty() {
        let (base, _requests) = serve(vec![StubResponse::json(500, json!({"message": "boom"}))]).await;
        assert!(store_at(&base).fetch_display_dataset().await.is_empty());
    }

    #[tokio::test]
    async fn categories_come_from_their_endpoint() {
        let (base, requests) = serve(vec![StubResponse::json(200, json!(["loQueGusto", "mantener"]))]).await;

        let categories = store_at(&base).fetch_categories().await.unwrap();

        assert_eq!(categories, vec!["Lo Que Gusto".to_string(), "Mantener".to_string()]);
        assert_eq!(requests.await.unwrap()[0].request_line, "GET /api/retro-data/categories HTTP/1.1");
    }

    #[tokio::test]
    async fn save_category_puts_values_under_storage_key() {
        let (base, requests) = serve(vec![StubResponse::json(200, json!({"ok": true}))]).await;

        let reply = store_at(&base)
            .save_category("Lo Que Gusto", &["a | b".to_string(), "c".to_string()])
            .await
            .unwrap();

        assert_eq!(reply, json!({"ok": true}));
        let requests = requests.await.unwrap();
        assert_eq!(requests[0].request_line, "PUT /api/retro-data/LoQueGusto HTTP/1.1");
        assert_eq!(requests[0].body_json(), json!({"values": ["a | b", "c"]}));
    }

    #[tokio::test]
    async fn add_category_seeds_placeholder() {
        let (base, requests) = serve(vec![StubResponse::json(200, json!({}))]).await;

        store_at(&base).add_category("Ideas Nuevas").await.unwrap();

        let requests = requests.await.unwrap();
        assert_eq!(requests[0].request_line, "PUT /api/retro-data/IdeasNuevas HTTP/1.1");
        assert_eq!(requests[0].body_json(), json!({"values": [PLACEHOLDER_ITEM]}));
    }

    #[tokio::test]
    async fn rejected_save_is_a_transport_error() {
        let (base, _requests) = serve(vec![StubResponse::json(404, json!({"error": "no such doc"}))]).await;

        let result = store_at(&base).save_category("mantener", &[]).await;

        match result {
            Err(RetroError::Transport(msg)) => assert!(msg.contains("404")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn csv_upload_sends_file_and_category_fields() {
        let (base, requests) = serve(vec![StubResponse::json(200, json!({"inserted": 2}))]).await;
        let csv = "autor,detalle\nAna, menos reuniones\nLuis,más demos\n";

        let rows = store_at(&base)
            .upload_csv("Lo Que Gusto", "retro.csv", csv.as_bytes().to_vec())
            .await
            .unwrap();

        assert_eq!(rows, vec!["Ana | menos reuniones", "Luis | más demos"]);

        let requests = requests.await.unwrap();
        let upload = &requests[0];
        assert_eq!(upload.request_line, "POST /api/upload-csv HTTP/1.1");
        assert!(upload
            .header("content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));

        let body = upload.body_text();
        assert!(body.contains("Content-Disposition: form-data; name=\"file\"; filename=\"retro.csv\""));
        assert!(body.contains("Content-Type: text/csv"));
        assert!(body.contains(csv));
        assert!(body.contains("Content-Disposition: form-data; name=\"category\"\r\n\r\nLoQueGusto\r\n"));
    }
}
