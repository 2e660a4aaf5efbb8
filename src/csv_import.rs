use crate::dataset::FIELD_DELIMITER;
use crate::error::{RetroError, RetroResult};

/// Parse CSV text into one display string per data row.
///
/// The header line is discarded. Fields are split on bare commas (no quoting),
/// trimmed, and rejoined with `" | "`. Fewer than two non-blank lines is an error.
pub fn parse_csv(text: &str) -> RetroResult<Vec<String>> {
    let rows: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|row| !row.is_empty())
        .collect();

    if rows.len() < 2 {
        return Err(RetroError::InsufficientCsv);
    }

    Ok(rows[1..]
        .iter()
        .map(|row| {
            row.split(',')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(FIELD_DELIMITER)
        })
        .collect())
}
