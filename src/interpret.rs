//! Classification of raw model text into a displayable answer.
//!
//! The model is asked (see `prompt`) to reply with a chart object, a value
//! object, or plain text. Whatever comes back collapses into exactly one
//! `InterpretedAnswer`; callers never see the parsed JSON.
//!
//! JSON is located by taking the span from the first `{` to the last `}`.
//! That is not a real parser: prose that happens to contain braces is tried as
//! JSON and, when it fails to parse, falls back to plain text silently.

use crate::chart::{ChartPayload, ChartPoint};
use serde_json::Value;

/// Shown when the model returns nothing
pub const NO_ANSWER: &str = "No tengo una respuesta en este momento.";

#[derive(Debug, Clone, PartialEq)]
pub enum InterpretedAnswer {
    PlainText(String),
    ScalarResult(f64),
    ChartResult(ChartPayload),
}

impl InterpretedAnswer {
    /// Text shown to the user and stored in history.
    ///
    /// Charts are rendered from persisted chart state, so only an
    /// acknowledgement with the title goes here.
    pub fn display_text(&self) -> String {
        match self {
            InterpretedAnswer::PlainText(text) => text.clone(),
            InterpretedAnswer::ScalarResult(value) => {
                format!("El resultado es: {}", format_number(*value))
            }
            InterpretedAnswer::ChartResult(chart) if chart.title.is_empty() => {
                "📊 Gráfico generado.".to_string()
            }
            InterpretedAnswer::ChartResult(chart) => {
                format!("📊 Gráfico generado: {}", chart.title)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InterpretedAnswer::PlainText(_) => "text",
            InterpretedAnswer::ScalarResult(_) => "value",
            InterpretedAnswer::ChartResult(_) => "chart",
        }
    }
}

/// Classify raw model output
pub fn interpret(raw: &str) -> InterpretedAnswer {
    if raw.trim().is_empty() {
        return InterpretedAnswer::PlainText(NO_ANSWER.to_string());
    }

    extract_json_candidate(raw)
        .and_then(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .and_then(|json| classify(&json))
        .unwrap_or_else(|| InterpretedAnswer::PlainText(paragraphs(raw)))
}

/// Span from the first `{` to the last `}`, inclusive
fn extract_json_candidate(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn classify(json: &Value) -> Option<InterpretedAnswer> {
    match json.get("type")?.as_str()? {
        "chart" => {
            let series = json
                .get("data")?
                .as_array()?
                .iter()
                .map(chart_point)
                .collect::<Option<Vec<_>>>()?;
            let title = json
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(InterpretedAnswer::ChartResult(ChartPayload { title, series }))
        }
        "value" => json.get("value")?.as_f64().map(InterpretedAnswer::ScalarResult),
        _ => None,
    }
}

fn chart_point(item: &Value) -> Option<ChartPoint> {
    Some(ChartPoint {
        name: item.get("name")?.as_str()?.to_string(),
        value: item.get("value")?.as_f64()?,
    })
}

/// Trim, then turn every line break into a paragraph break
fn paragraphs(raw: &str) -> String {
    raw.trim().replace('\n', "\n\n")
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
