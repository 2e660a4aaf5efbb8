//! Error taxonomy for the retrospective pipeline.
//!
//! Nothing here is fatal to the caller: transport problems are shown inline,
//! malformed data is logged and treated as empty, and JSON found inside a model
//! answer that fails to parse is never an error at all (see `interpret`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetroError {
    /// Network or HTTP status failure on any remote call
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote side answered with a shape we cannot use
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The completion endpoint failed or returned no text
    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    /// CSV upload with fewer than two non-blank lines
    #[error("El archivo CSV no tiene datos suficientes.")]
    InsufficientCsv,

    /// A completion request is already in flight
    #[error("A question is already being answered")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RetroError {
    fn from(err: reqwest::Error) -> Self {
        RetroError::Transport(err.to_string())
    }
}

impl RetroError {
    /// Text shown inline to the user in place of an answer
    pub fn user_message(&self) -> String {
        match self {
            RetroError::CompletionFailed(msg) => format!("❌ Error: {}", msg),
            RetroError::Transport(_) => {
                "❌ Error al obtener la respuesta. Verifica la conexión.".to_string()
            }
            RetroError::InsufficientCsv => format!("⚠️ {}", self),
            RetroError::Busy => "⏳ Cargando...".to_string(),
            other => format!("❌ Error: {}", other),
        }
    }
}

pub type RetroResult<T> = Result<T, RetroError>;
