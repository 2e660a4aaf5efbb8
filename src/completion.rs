use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{RetroError, RetroResult};
use crate::logging;

/// Anything that turns a prompt into raw model text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> RetroResult<String>;
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
}

/// Client for a `generateContent`-style endpoint.
///
/// The URL is a server-side proxy that attaches the API key; no credential is
/// held here. One request per call, no retries, transport-default timeouts.
pub struct GenerativeClient {
    client: Client,
    endpoint: String,
}

impl GenerativeClient {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GenerativeClient {
    async fn complete(&self, prompt: &str) -> RetroResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt.to_string() }],
            }],
        };

        let response = self.client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RetroError::CompletionFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RetroError::CompletionFailed(e.to_string()))?;

        let text = extract_text(status.is_success(), &body);
        match &text {
            Ok(t) => logging::log_completion(None, &format!("Completion ok ({}), {} chars", status, t.len())),
            Err(e) => logging::log_error(None, &format!("Completion failed ({}): {}", status, e)),
        }
        text
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response body
fn extract_text(success: bool, body: &str) -> RetroResult<String> {
    let parsed = serde_json::from_str::<GenerateContentResponse>(body);

    if let Ok(GenerateContentResponse { error: Some(err), .. }) = &parsed {
        return Err(RetroError::CompletionFailed(err.message.clone()));
    }

    if !success {
        let snippet: String = body.chars().take(200).collect();
        return Err(RetroError::CompletionFailed(format!("HTTP error: {}", snippet)));
    }

    let parsed = parsed.map_err(|e| RetroError::CompletionFailed(format!("unreadable response: {}", e)))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| RetroError::CompletionFailed("No text in completion response".to_string()))
}
