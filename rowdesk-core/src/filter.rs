//! Single-column substring filter
//!
//! The dashboard offers one filter: pick a column by position and keep the
//! rows whose value in that column contains a search string, ignoring case.
//! Column positions refer to the key order of the first row.

use crate::error::{PanelError, PanelResult};
use crate::row::{cell_text, Row, RowSet};
use serde::{Deserialize, Serialize};

/// Column position plus search text, as submitted with a dashboard or export request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub column_index: Option<usize>,
    pub search: String,
}

impl FilterCriterion {
    pub fn new(column_index: Option<usize>, search: impl Into<String>) -> Self {
        Self {
            column_index,
            search: search.into(),
        }
    }

    /// Build a criterion from raw request parameters.
    ///
    /// A column index that is not a non-negative integer counts as absent.
    pub fn from_params(column_index: Option<&str>, search: Option<&str>) -> Self {
        let column_index = column_index
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<usize>().ok());
        Self::new(column_index, search.unwrap_or_default())
    }

    /// Whether applying this criterion can narrow a row set.
    pub fn is_active(&self) -> bool {
        self.column_index.is_some() && !self.search.is_empty()
    }

    pub fn apply(&self, rows: &[Row]) -> PanelResult<RowSet> {
        try_apply_filter(rows, self.column_index, &self.search)
    }
}

/// Filter `rows`, reporting an out-of-range column instead of ignoring it.
///
/// Returns the input unchanged when `substring` is empty or no column is given.
pub fn try_apply_filter(
    rows: &[Row],
    column_index: Option<usize>,
    substring: &str,
) -> PanelResult<RowSet> {
    let index = match column_index {
        Some(index) if !substring.is_empty() => index,
        _ => return Ok(rows.to_vec()),
    };
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let column = first
        .keys()
        .nth(index)
        .ok_or(PanelError::FilterIndexOutOfRange {
            index,
            columns: first.len(),
        })?;

    let needle = substring.to_lowercase();
    let kept: RowSet = rows
        .iter()
        .filter(|row| cell_text(row.get(column)).to_lowercase().contains(&needle))
        .cloned()
        .collect();

    tracing::debug!(
        column = column.as_str(),
        input = rows.len(),
        kept = kept.len(),
        "Applied column filter"
    );
    Ok(kept)
}

/// Filter `rows`; an out-of-range column leaves them unchanged.
pub fn apply_filter(rows: &[Row], column_index: Option<usize>, substring: &str) -> RowSet {
    try_apply_filter(rows, column_index, substring).unwrap_or_else(|_| rows.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows() -> RowSet {
        [
            json!({"id": 1, "name": "Alice", "city": "Paris"}),
            json!({"id": 2, "name": "bob", "city": "Berlin"}),
            json!({"id": 3, "name": "ALINE", "city": null}),
            json!({"id": 14, "name": "Carl", "city": "Lisbon"}),
        ]
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .collect()
    }

    #[test]
    fn test_empty_search_is_identity() {
        let input = rows();
        assert_eq!(apply_filter(&input, Some(1), ""), input);
        assert_eq!(apply_filter(&input, Some(99), ""), input);
    }

    #[test]
    fn test_missing_index_is_identity() {
        let input = rows();
        assert_eq!(apply_filter(&input, None, "ali"), input);
    }

    #[test]
    fn test_case_insensitive_match() {
        let filtered = apply_filter(&rows(), Some(1), "aLi");
        assert_eq!(ids(&filtered), vec![1, 3]);
    }

    #[test]
    fn test_numeric_column_is_stringified() {
        let filtered = apply_filter(&rows(), Some(0), "1");
        assert_eq!(ids(&filtered), vec![1, 14]);
    }

    #[test]
    fn test_null_never_matches_non_empty_search() {
        let filtered = apply_filter(&rows(), Some(2), "l");
        assert_eq!(ids(&filtered), vec![2, 14]);
    }

    #[test]
    fn test_out_of_range_is_reported_then_ignored() {
        let input = rows();
        assert_eq!(
            try_apply_filter(&input, Some(3), "x"),
            Err(PanelError::FilterIndexOutOfRange { index: 3, columns: 3 })
        );
        assert_eq!(apply_filter(&input, Some(3), "x"), input);
    }

    #[test]
    fn test_empty_rows_stay_empty() {
        assert!(apply_filter(&[], Some(5), "x").is_empty());
        assert_eq!(try_apply_filter(&[], Some(5), "x"), Ok(Vec::new()));
    }

    #[test]
    fn test_criterion_from_params() {
        let c = FilterCriterion::from_params(Some(" 2 "), Some("abc"));
        assert_eq!(c, FilterCriterion::new(Some(2), "abc"));
        assert!(c.is_active());

        let c = FilterCriterion::from_params(Some("-1"), Some("abc"));
        assert_eq!(c.column_index, None);
        assert!(!c.is_active());

        let c = FilterCriterion::from_params(Some(""), None);
        assert_eq!(c, FilterCriterion::default());
    }
}
