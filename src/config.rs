use crate::error::{RetroError, RetroResult};
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:5000/api/retro-data";
const DEFAULT_UPLOAD_URL: &str = "http://localhost:5000/api/upload-csv";
// Server-side proxy in front of the generative API. The API key lives there.
const DEFAULT_COMPLETION_URL: &str = "http://localhost:5000/api/completion";

/// Runtime configuration, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub upload_url: String,
    pub completion_url: String,
    pub data_dir: PathBuf,
    pub history_limit: Option<usize>,
}

impl Config {
    pub fn from_env() -> RetroResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> RetroResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match non_empty("RETRO_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".retro-insight")
            }
        };

        let history_limit = match non_empty("RETRO_HISTORY_LIMIT") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(RetroError::Config(format!(
                        "RETRO_HISTORY_LIMIT must be a positive integer, got '{}'",
                        raw
                    )))
                }
                Ok(n) => Some(n),
            },
            None => None,
        };

        Ok(Self {
            api_url: trim_url(non_empty("RETRO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string())),
            upload_url: non_empty("RETRO_UPLOAD_URL").unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string()),
            completion_url: non_empty("RETRO_COMPLETION_URL").unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string()),
            data_dir,
            history_limit,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("retro.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
