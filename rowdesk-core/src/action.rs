//! Dashboard write actions
//!
//! A dashboard POST carries an `action` discriminator, an optional `row_id`
//! and the column values of the edited row, all as form fields.
//!
//! A table with no rows has no known columns, so its add form sends
//! repeated `field_name`/`field_value` pairs instead.

use crate::row::{FieldMap, RowId, PRIMARY_KEY};
use thiserror::Error;

/// Form field holding the action discriminator.
pub const ACTION_FIELD: &str = "action";

/// Form field holding the target row's primary key.
pub const ROW_ID_FIELD: &str = "row_id";

/// Repeated form field naming a column of a free-form add.
pub const FIELD_NAME_FIELD: &str = "field_name";

/// Repeated form field holding the value for the matching `field_name`.
pub const FIELD_VALUE_FIELD: &str = "field_value";

const RESERVED_FIELDS: [&str; 4] = [
    ACTION_FIELD,
    ROW_ID_FIELD,
    FIELD_NAME_FIELD,
    FIELD_VALUE_FIELD,
];

/// A write request against the active table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardAction {
    Add { fields: FieldMap },
    Update { row_id: RowId, fields: FieldMap },
    Delete { row_id: RowId },
    /// Any other discriminator, including a missing one. Ignored.
    Unrecognized(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Action '{action}' requires a row_id")]
    MissingRowId { action: &'static str },

    #[error("Invalid row_id '{value}'")]
    InvalidRowId { value: String },
}

impl DashboardAction {
    /// Parse submitted form pairs, in submission order.
    ///
    /// Only presence is checked: `row_id` must parse as an integer for
    /// update and delete, everything else is passed through as column values.
    pub fn from_form<K, V>(pairs: &[(K, V)]) -> Result<Self, ActionError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let action = first_value(pairs, ACTION_FIELD).unwrap_or_default().trim();

        match action {
            "add" => {
                let mut fields = column_fields(pairs);
                for (column, value) in free_form_fields(pairs) {
                    fields.insert(column, value);
                }
                if fields.get(PRIMARY_KEY).is_some_and(|id| id.trim().is_empty()) {
                    fields.remove(PRIMARY_KEY);
                }
                Ok(DashboardAction::Add { fields })
            }
            "update" => {
                let row_id = parse_row_id(first_value(pairs, ROW_ID_FIELD), "update")?;
                let mut fields = column_fields(pairs);
                fields.remove(PRIMARY_KEY);
                Ok(DashboardAction::Update { row_id, fields })
            }
            "delete" => {
                let row_id = parse_row_id(first_value(pairs, ROW_ID_FIELD), "delete")?;
                Ok(DashboardAction::Delete { row_id })
            }
            other => Ok(DashboardAction::Unrecognized(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DashboardAction::Add { .. } => "add",
            DashboardAction::Update { .. } => "update",
            DashboardAction::Delete { .. } => "delete",
            DashboardAction::Unrecognized(name) => name,
        }
    }
}

fn first_value<'a, K, V>(pairs: &'a [(K, V)], key: &str) -> Option<&'a str>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .find(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.as_ref())
}

fn all_values<'a, K, V>(pairs: &'a [(K, V)], key: &'static str) -> impl Iterator<Item = &'a str>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .filter(move |(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.as_ref())
}

fn column_fields<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .filter(|(k, _)| !RESERVED_FIELDS.contains(k))
        .collect()
}

/// `field_name`/`field_value` pairs matched by position. Blank names are skipped.
fn free_form_fields<'a, K, V>(pairs: &'a [(K, V)]) -> Vec<(&'a str, &'a str)>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    all_values(pairs, FIELD_NAME_FIELD)
        .zip(all_values(pairs, FIELD_VALUE_FIELD).chain(std::iter::repeat("")))
        .map(|(name, value)| (name.trim(), value))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn parse_row_id(raw: Option<&str>, action: &'static str) -> Result<RowId, ActionError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or(ActionError::MissingRowId { action })?;
    raw.parse().map_err(|_| ActionError::InvalidRowId {
        value: raw.to_string(),
    })
}
