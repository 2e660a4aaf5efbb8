//! Retrospective dataset shapes and their normalization.
//!
//! The remote store hands back one or more loosely shaped documents. Both
//! normalized shapes are ordered by first appearance of each category, which
//! is the order charts and prompts use.

use crate::error::{RetroError, RetroResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document identity key added by the store; never a category
pub const IDENTITY_KEY: &str = "_id";

/// Seed item of a freshly created category that has no real data yet
pub const PLACEHOLDER_ITEM: &str = "No existen datos";

/// Delimiter used when a record (or a CSV row) collapses to one display string
pub const FIELD_DELIMITER: &str = " | ";

/// Attribute key used when a plain string item is lifted into a record
pub const TEXT_ATTRIBUTE: &str = "texto";

pub type AttributeRecord = IndexMap<String, String>;

/// Items that can stand for the "no data" placeholder
pub trait CategoryItem {
    fn is_placeholder(&self) -> bool;
}

impl CategoryItem for String {
    fn is_placeholder(&self) -> bool {
        self.trim() == PLACEHOLDER_ITEM
    }
}

impl CategoryItem for AttributeRecord {
    fn is_placeholder(&self) -> bool {
        self.len() == 1 && self.values().all(|v| v.trim() == PLACEHOLDER_ITEM)
    }
}

/// Ordered mapping of category name to its items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categorized<T> {
    categories: IndexMap<String, Vec<T>>,
}

/// Category name -> display strings (charts and counts)
pub type CategoryDataset = Categorized<String>;

/// Category name -> attribute records (prompting)
pub type CategoryRecordset = Categorized<AttributeRecord>;

impl<T> Default for Categorized<T> {
    fn default() -> Self {
        Self {
            categories: IndexMap::new(),
        }
    }
}

impl<T: CategoryItem> Categorized<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append items to a category, creating it at the end if new
    pub fn extend_category(&mut self, name: &str, items: impl IntoIterator<Item = T>) {
        self.categories
            .entry(name.to_string())
            .or_default()
            .extend(items);
    }

    pub fn insert(&mut self, name: impl Into<String>, items: Vec<T>) {
        self.categories.insert(name.into(), items);
    }

    pub fn get(&self, name: &str) -> Option<&[T]> {
        self.categories.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(|k| k.as_str())
    }

    /// Every category as stored, placeholders included
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Categories with real content. Empty ones and those holding only the
    /// placeholder are skipped.
    pub fn populated(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.iter().filter(|(_, items)| !is_effectively_empty(items))
    }

    /// Copy restricted to populated categories
    pub fn without_empty(&self) -> Self
    where
        T: Clone,
    {
        let mut out = Self::new();
        for (name, items) in self.populated() {
            out.insert(name, items.to_vec());
        }
        out
    }
}

pub fn is_effectively_empty<T: CategoryItem>(items: &[T]) -> bool {
    match items {
        [] => true,
        [only] => only.is_placeholder(),
        _ => false,
    }
}

// ============ Normalization ============

/// Normalize a raw store document into display strings
pub fn normalize_display(raw: &Value) -> RetroResult<CategoryDataset> {
    normalize(raw, display_item)
}

/// Normalize a raw store document into attribute records
pub fn normalize_recordset(raw: &Value) -> RetroResult<CategoryRecordset> {
    normalize(raw, record_item)
}

fn normalize<T, F>(raw: &Value, convert: F) -> RetroResult<Categorized<T>>
where
    T: CategoryItem,
    F: Fn(&Value) -> Option<T>,
{
    let documents: Vec<&serde_json::Map<String, Value>> = match raw {
        Value::Array(docs) => docs.iter().filter_map(Value::as_object).collect(),
        Value::Object(doc) => vec![doc],
        other => {
            return Err(RetroError::MalformedResponse(format!(
                "expected an array or object of categories, got {}",
                json_kind(other)
            )))
        }
    };

    let mut out = Categorized::new();
    for doc in documents {
        for (key, value) in doc {
            if key == IDENTITY_KEY {
                continue;
            }
            if let Value::Array(items) = value {
                out.extend_category(key, items.iter().filter_map(&convert));
            }
        }
    }

    Ok(out)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        nested => Some(nested.to_string()),
    }
}

fn display_item(value: &Value) -> Option<String> {
    match value {
        Value::Object(record) => {
            let joined = record
                .iter()
                .filter(|(k, _)| k.as_str() != IDENTITY_KEY)
                .filter_map(|(_, v)| scalar_text(v))
                .collect::<Vec<_>>()
                .join(FIELD_DELIMITER);
            Some(joined)
        }
        Value::Array(_) => None,
        other => scalar_text(other),
    }
}

fn record_item(value: &Value) -> Option<AttributeRecord> {
    match value {
        Value::Object(record) => Some(
            record
                .iter()
                .filter(|(k, _)| k.as_str() != IDENTITY_KEY)
                .filter_map(|(k, v)| scalar_text(v).map(|text| (k.clone(), text)))
                .collect(),
        ),
        Value::Array(_) => None,
        other => scalar_text(other).map(|text| {
            let mut record = AttributeRecord::new();
            record.insert(TEXT_ATTRIBUTE.to_string(), text);
            record
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============ Category names ============

/// `loQueGusto` -> `Lo Que Gusto`
pub fn format_category_name(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }

    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Lo Que Gusto` -> `LoQueGusto`
pub fn revert_category_name(name: &str) -> String {
    name.split_whitespace().collect()
}
