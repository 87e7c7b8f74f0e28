//! In-memory gateway for tests and demo mode.

use super::{GatewayError, GatewayResult, TableGateway};
use crate::row::{row_id, FieldMap, Row, RowId, RowSet, PRIMARY_KEY};
use crate::table::TableName;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct MemoryTable {
    name: String,
    rows: RowSet,
}

/// Tables held in process memory, mimicking the REST service's behavior.
///
/// Tables are listed in the order they were added. Inserted rows get the
/// next integer `id` unless one is supplied. Column order of new rows follows
/// the table's first row.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    tables: RwLock<Vec<MemoryTable>>,
    offline: AtomicBool,
    listing_disabled: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`InMemoryGateway::add_table`].
    pub fn with_table(self, name: impl Into<String>, rows: RowSet) -> Self {
        self.add_table(name, rows);
        self
    }

    /// Create or replace a table.
    pub fn add_table(&self, name: impl Into<String>, rows: RowSet) {
        let name = name.into();
        let mut tables = match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match tables.iter_mut().find(|t| t.name == name) {
            Some(table) => table.rows = rows,
            None => tables.push(MemoryTable { name, rows }),
        }
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, name: &str) -> Option<RowSet> {
        let tables = self.read().ok()?;
        tables.iter().find(|t| t.name == name).map(|t| t.rows.clone())
    }

    /// Simulate an outage: every call fails as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Simulate a service without the table enumeration procedure.
    pub fn set_listing_disabled(&self, disabled: bool) {
        self.listing_disabled.store(disabled, Ordering::SeqCst);
    }

    fn check_online(&self) -> GatewayResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> GatewayResult<RwLockReadGuard<'_, Vec<MemoryTable>>> {
        self.tables
            .read()
            .map_err(|_| GatewayError::Unreachable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> GatewayResult<RwLockWriteGuard<'_, Vec<MemoryTable>>> {
        self.tables
            .write()
            .map_err(|_| GatewayError::Unreachable("in-memory store lock poisoned".to_string()))
    }
}

fn missing_relation(table: &TableName) -> GatewayError {
    GatewayError::Rejected {
        status: 404,
        message: format!("relation \"public.{}\" does not exist", table),
    }
}

fn unknown_column(table: &TableName, column: &str) -> GatewayError {
    GatewayError::Rejected {
        status: 400,
        message: format!("Could not find the '{}' column of '{}'", column, table),
    }
}

fn find_table<'a>(
    tables: &'a mut [MemoryTable],
    table: &TableName,
) -> GatewayResult<&'a mut RowSet> {
    tables
        .iter_mut()
        .find(|t| t.name == table.as_str())
        .map(|t| &mut t.rows)
        .ok_or_else(|| missing_relation(table))
}

/// Reject columns the table does not have. Empty tables accept anything.
fn check_columns(rows: &[Row], table: &TableName, fields: &FieldMap) -> GatewayResult<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    match fields.columns().find(|c| !first.contains_key(*c)) {
        Some(column) => Err(unknown_column(table, column)),
        None => Ok(()),
    }
}

#[async_trait]
impl TableGateway for InMemoryGateway {
    async fn list_tables(&self) -> GatewayResult<Vec<String>> {
        self.check_online()?;
        if self.listing_disabled.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 404,
                message: "Could not find the function public.get_tables".to_string(),
            });
        }
        Ok(self.read()?.iter().map(|t| t.name.clone()).collect())
    }

    async fn fetch_all(&self, table: &TableName) -> GatewayResult<RowSet> {
        self.check_online()?;
        self.read()?
            .iter()
            .find(|t| t.name == table.as_str())
            .map(|t| t.rows.clone())
            .ok_or_else(|| missing_relation(table))
    }

    async fn insert(&self, table: &TableName, fields: &FieldMap) -> GatewayResult<()> {
        self.check_online()?;
        let mut tables = self.write()?;
        let rows = find_table(&mut tables, table)?;
        check_columns(rows, table, fields)?;

        let id = match fields.get(PRIMARY_KEY) {
            Some(raw) => raw.parse::<RowId>().map_err(|_| GatewayError::Rejected {
                status: 400,
                message: format!("invalid input syntax for type bigint: \"{}\"", raw),
            })?,
            None => {
                let max = rows.iter().filter_map(row_id).map(RowId::get).max();
                let next = max.unwrap_or(0).checked_add(1).ok_or_else(|| {
                    GatewayError::Rejected {
                        status: 400,
                        message: format!("id sequence for {} is exhausted", table),
                    }
                })?;
                RowId::new(next)
            }
        };
        if rows.iter().any(|r| row_id(r) == Some(id)) {
            return Err(GatewayError::Rejected {
                status: 409,
                message: format!("duplicate key value violates unique constraint on id {}", id),
            });
        }

        let mut row = Row::new();
        row.insert(PRIMARY_KEY.to_string(), Value::from(id.get()));
        if let Some(first) = rows.first() {
            for column in first.keys().filter(|c| c.as_str() != PRIMARY_KEY) {
                row.insert(column.clone(), Value::Null);
            }
        }
        for (column, value) in fields.iter().filter(|(c, _)| *c != PRIMARY_KEY) {
            row.insert(column.to_string(), Value::String(value.to_string()));
        }
        rows.push(row);
        Ok(())
    }

    async fn update(&self, table: &TableName, id: RowId, fields: &FieldMap) -> GatewayResult<()> {
        self.check_online()?;
        let mut tables = self.write()?;
        let rows = find_table(&mut tables, table)?;
        check_columns(rows, table, fields)?;

        for row in rows.iter_mut().filter(|r| row_id(r) == Some(id)) {
            for (column, value) in fields.iter() {
                row.insert(column.to_string(), Value::String(value.to_string()));
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &TableName, id: RowId) -> GatewayResult<()> {
        self.check_online()?;
        let mut tables = self.write()?;
        let rows = find_table(&mut tables, table)?;
        rows.retain(|r| row_id(r) != Some(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;
    use serde_json::json;

    fn users() -> RowSet {
        [json!({"id": 1, "name": "A"}), json!({"id": 7, "name": "G"})]
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    fn table(name: &str) -> Result<TableName, PanelError> {
        TableName::parse(name)
    }

    #[tokio::test]
    async fn test_list_tables_in_insertion_order() -> Result<(), Box<dyn std::error::Error>> {
        let gateway = InMemoryGateway::new()
            .with_table("users", users())
            .with_table("orders", Vec::new());
        assert_eq!(gateway.list_tables().await?, vec!["users", "orders"]);

        gateway.set_listing_disabled(true);
        assert!(matches!(
            gateway.list_tables().await,
            Err(GatewayError::Rejected { status: 404, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id() -> Result<(), Box<dyn std::error::Error>> {
        let gateway = InMemoryGateway::new().with_table("users", users());
        let users = table("users")?;
        let fields: FieldMap = vec![("name", "H")].into_iter().collect();
        gateway.insert(&users, &fields).await?;

        let rows = gateway.fetch_all(&users).await?;
        assert_eq!(rows.len(), 3);
        assert_eq!(Value::Object(rows[2].clone()), json!({"id": 8, "name": "H"}));
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_after_max_id_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(i64::MAX));
        row.insert("name".to_string(), Value::from("last"));
        let gateway = InMemoryGateway::new().with_table("users", vec![row]);
        let users = table("users")?;

        let fields: FieldMap = vec![("name", "overflow")].into_iter().collect();
        assert!(matches!(
            gateway.insert(&users, &fields).await,
            Err(GatewayError::Rejected { status: 400, .. })
        ));
        assert_eq!(gateway.rows("users").map(|r| r.len()), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_columns()-> Result<(), Box<dyn std::error::Error>> {
        let gateway = InMemoryGateway::new().with_table("users", users());
        let users = table("users")?;

        let unknown: FieldMap = vec![("nickname", "x")].into_iter().collect();
        assert!(matches!(
            gateway.insert(&users, &unknown).await,
            Err(GatewayError::Rejected { status: 400, .. })
        ));

        let duplicate: FieldMap = vec![("id", "7"), ("name", "dup")].into_iter().collect();
        assert!(matches!(
            gateway.insert(&users, &duplicate).await,
            Err(GatewayError::Rejected { status: 409, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() -> Result<(), Box<dyn std::error::Error>> {
        let gateway = InMemoryGateway::new().with_table("users", users());
        let users = table("users")?;

        let fields: FieldMap = vec![("name", "Z")].into_iter().collect();
        gateway.update(&users, RowId::new(7), &fields).await?;
        gateway.delete(&users, RowId::new(1)).await?;
        // absent ids are not an error
        gateway.delete(&users, RowId::new(404)).await?;

        let rows = gateway.fetch_all(&users).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(Value::Object(rows[0].clone()), json!({"id": 7, "name": "Z"}));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_table_and_outage() -> Result<(), Box<dyn std::error::Error>> {
        let gateway = InMemoryGateway::new().with_table("users", users());
        assert!(matches!(
            gateway.fetch_all(&table("ghosts")?).await,
            Err(GatewayError::Rejected { status: 404, .. })
        ));

        gateway.set_offline(true);
        let outcome = gateway.fetch_all(&table("users")?).await;
        assert!(outcome.is_err_and(|e| e.is_unreachable()));
        Ok(())
    }
}
