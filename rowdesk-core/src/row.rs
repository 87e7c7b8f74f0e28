//! Row model
//!
//! Rows are kept as JSON objects exactly as the remote service returns them.
//! `serde_json` is built with `preserve_order`, so the key order of a row is
//! the column order the service reported. The filter and export engines rely
//! on that order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Name of the implicit primary key column.
pub const PRIMARY_KEY: &str = "id";

/// One table row: column name to scalar value.
pub type Row = Map<String, Value>;

/// Rows of one table, in the order the remote service returned them.
pub type RowSet = Vec<Row>;

// ============================================================================
// ROW IDENTIFIER
// ============================================================================

/// Integer primary key of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(i64);

impl RowId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for RowId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read the primary key of a row, accepting integers and numeric strings.
pub fn row_id(row: &Row) -> Option<RowId> {
    match row.get(PRIMARY_KEY)? {
        Value::Number(n) => n.as_i64().map(RowId),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// ============================================================================
// COLUMN HELPERS
// ============================================================================

/// Column names of a row set, taken from the first row's keys.
///
/// Later rows with different keys are not reconciled.
pub fn column_names(rows: &[Row]) -> Vec<&str> {
    rows.first()
        .map(|row| row.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Text form of a cell, as shown in the dashboard and matched by the filter.
///
/// Null and missing cells render as the empty string.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

// ============================================================================
// FIELD MAP
// ============================================================================

/// Column values submitted from a form, in submission order.
///
/// Values are always strings; the remote service coerces them to the
/// column type. The first occurrence of a repeated key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(Map<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a field unless the key is already present.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0
            .entry(column.into())
            .or_insert_with(|| Value::String(value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        match self.0.shift_remove(column) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
    }

    /// JSON object body for the remote service.
    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FieldMap::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}
