use crate::dataset::CategoryDataset;
use serde::{Deserialize, Serialize};

/// One bar / slice / point of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: f64,
}

/// A named series ready for rendering
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartPayload {
    pub title: String,
    pub series: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Pie,
    #[default]
    Bar,
    Line,
    Area,
    Scatter,
}

impl ChartType {
    pub const ALL: [ChartType; 5] = [
        ChartType::Pie,
        ChartType::Bar,
        ChartType::Line,
        ChartType::Area,
        ChartType::Scatter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Pie => "pie",
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Area => "area",
            ChartType::Scatter => "scatter",
        }
    }

    pub fn from_str(s: &str) -> Option<ChartType> {
        match s.trim().to_lowercase().as_str() {
            "pie" => Some(ChartType::Pie),
            "bar" => Some(ChartType::Bar),
            "line" => Some(ChartType::Line),
            "area" => Some(ChartType::Area),
            "scatter" => Some(ChartType::Scatter),
            _ => None,
        }
    }
}

/// Category -> item count, skipping categories with nothing to show
pub fn build_distribution(dataset: &CategoryDataset) -> Vec<ChartPoint> {
    dataset
        .populated()
        .map(|(name, items)| ChartPoint {
            name: name.to_string(),
            value: items.len() as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PLACEHOLDER_ITEM;

    fn point(name: &str, value: f64) -> ChartPoint {
        ChartPoint { name: name.to_string(), value }
    }

    #[test]
    fn distribution_skips_empty_categories_in_order() {
        let mut dataset = CategoryDataset::new();
        dataset.insert("A", vec!["x".to_string(), "y".to_string()]);
        dataset.insert("B", vec![]);
        dataset.insert("C", vec!["z".to_string()]);

        assert_eq!(build_distribution(&dataset), vec![point("A", 2.0), point("C", 1.0)]);
    }

    #[test]
    fn placeholder_only_category_is_not_charted() {
        let mut dataset = CategoryDataset::new();
        dataset.insert("nueva", vec![PLACEHOLDER_ITEM.to_string()]);
        dataset.insert("mantener", vec!["daily".to_string(), PLACEHOLDER_ITEM.to_string()]);

        assert_eq!(build_distribution(&dataset), vec![point("mantener", 2.0)]);
    }

    #[test]
    fn chart_type_names() {
        for chart_type in ChartType::ALL {
            assert_eq!(ChartType::from_str(chart_type.as_str()), Some(chart_type));
        }
        assert_eq!(ChartType::from_str(" PIE "), Some(ChartType::Pie));
        assert_eq!(ChartType::from_str("donut"), None);
        assert_eq!(ChartType::default(), ChartType::Bar);
    }
}
