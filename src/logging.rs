//! Structured logging module for Retro Insight
//!
//! Writes daily log files to `<data dir>/logs/` with categories:
//! - DATASET: Remote store reads and writes
//! - PROMPT: Prompt construction
//! - COMPLETION: Generative endpoint round-trips
//! - INTERPRET: How a model answer was classified
//! - STORAGE: Durable history/chart state
//! - ERROR: Errors

use chrono::{Local, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use once_cell::sync::Lazy;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy)]
pub enum LogCategory {
    Dataset,
    Prompt,
    Completion,
    Interpret,
    Storage,
    Error,
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Dataset => "DATASET",
            LogCategory::Prompt => "PROMPT",
            LogCategory::Completion => "COMPLETION",
            LogCategory::Interpret => "INTERPRET",
            LogCategory::Storage => "STORAGE",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Log directory, set once by `init_logging`. Until then only stdout is used.
static LOG_DIR: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

fn current_log_dir() -> Option<PathBuf> {
    LOG_DIR.lock().ok().and_then(|dir| dir.clone())
}

/// Get today's log file path
fn log_file_path(log_dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    log_dir.join(format!("retro-{}.log", today))
}

/// Initialize the logging system - creates log directory if needed
pub fn init_logging(log_dir: PathBuf) -> std::io::Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    if let Ok(mut slot) = LOG_DIR.lock() {
        *slot = Some(log_dir);
    }

    log(LogCategory::Storage, None, "Retro Insight logging initialized");

    Ok(())
}

/// Format one log line. `context` is usually the question being answered.
fn format_line(timestamp: &str, category: LogCategory, context: Option<&str>, message: &str) -> String {
    let context = context
        .map(|c| {
            let short: String = c.chars().take(40).collect();
            format!("q=\"{}\" | ", short)
        })
        .unwrap_or_default();

    format!("[{}] [{}] {}{}\n", timestamp, category.as_str(), context, message)
}

/// Log a message with category and optional question context
pub fn log(category: LogCategory, context: Option<&str>, message: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let log_line = format_line(&timestamp, category, context, message);

    print!("{}", log_line);

    if let Some(dir) = current_log_dir() {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path(&dir))
        {
            let _ = file.write_all(log_line.as_bytes());
        }
    }
}

pub fn log_dataset(message: &str) {
    log(LogCategory::Dataset, None, message);
}

pub fn log_prompt(question: Option<&str>, message: &str) {
    log(LogCategory::Prompt, question, message);
}

pub fn log_completion(question: Option<&str>, message: &str) {
    log(LogCategory::Completion, question, message);
}

pub fn log_interpret(question: Option<&str>, message: &str) {
    log(LogCategory::Interpret, question, message);
}

pub fn log_storage(message: &str) {
    log(LogCategory::Storage, None, message);
}

pub fn log_error(question: Option<&str>, message: &str) {
    log(LogCategory::Error, question, message);
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs() -> std::io::Result<usize> {
    let Some(log_dir) = current_log_dir() else {
        return Ok(0);
    };
    let mut deleted = 0;

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(7);

    for entry in fs::read_dir(&log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified_time: chrono::DateTime<Utc> = modified.into();
                if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                    deleted += 1;
                }
            }
        }
    }

    Ok(deleted)
}
