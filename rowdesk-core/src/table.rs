//! Table references and the table allowlist

use crate::error::{PanelError, PanelResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Unquoted Postgres identifier, at most 63 bytes.
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("Invalid identifier regex"));

/// Name of a remote table.
///
/// Only plain identifiers are accepted, so a name can be placed in a REST
/// path segment without escaping. Whether the table exists is only known
/// once a query against it succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    pub fn parse(raw: &str) -> PanelResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PanelError::InvalidTableName {
                name: raw.to_string(),
                reason: "name is empty".to_string(),
            });
        }
        if !IDENTIFIER.is_match(trimmed) {
            return Err(PanelError::InvalidTableName {
                name: raw.to_string(),
                reason: "expected letters, digits and underscores".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which tables the panel may touch.
///
/// An empty allowlist admits every valid identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePolicy {
    allowlist: Vec<TableName>,
}

impl TablePolicy {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn with_allowlist(allowlist: Vec<TableName>) -> Self {
        Self { allowlist }
    }

    pub fn allowlist(&self) -> &[TableName] {
        &self.allowlist
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowlist.is_empty()
    }

    pub fn allows(&self, table: &TableName) -> bool {
        self.allowlist.is_empty() || self.allowlist.contains(table)
    }

    /// Validate a requested table name against identifier rules and the allowlist.
    pub fn resolve(&self, raw: &str) -> PanelResult<TableName> {
        let table = TableName::parse(raw)?;
        if !self.allows(&table) {
            return Err(PanelError::InvalidTableName {
                name: table.0,
                reason: "table is not in the allowlist".to_string(),
            });
        }
        Ok(table)
    }

    /// Keep the remotely listed names this policy admits, in listing order.
    pub fn retain_allowed<I, S>(&self, names: I) -> Vec<TableName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                match self.resolve(name) {
                    Ok(table) => Some(table),
                    Err(err) => {
                        tracing::debug!(table = name, error = %err, "Skipping listed table");
                        None
                    }
                }
            })
            .collect()
    }
}
