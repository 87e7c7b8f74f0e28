//! rowdesk Test Utilities
//!
//! Shared test infrastructure for the rowdesk workspace:
//! - Row fixtures for common scenarios
//! - A pre-seeded in-memory gateway
//! - Proptest generators for rows and credentials
//! - Reading exported workbooks back

pub use rowdesk_core::{FieldMap, InMemoryGateway, Row, RowId, RowSet, TableGateway, TableName};

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Reader, Xlsx};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Username the fixtures log in with.
pub const TEST_ADMIN_USERNAME: &str = "admin";

/// Password the fixtures log in with.
pub const TEST_ADMIN_PASSWORD: &str = "admin123";

// ============================================================================
// FIXTURES
// ============================================================================

/// Convert a JSON object literal into a [`Row`]. Non-objects become empty rows.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Rows of the `users` fixture table. Row 7 exists so delete scenarios can target it.
pub fn users_fixture() -> RowSet {
    vec![
        row(json!({"id": 1, "name": "Ada Lovelace", "email": "ada@example.com", "active": true})),
        row(json!({"id": 2, "name": "Grace Hopper", "email": "grace@example.com", "active": true})),
        row(json!({"id": 7, "name": "Alan Turing", "email": "alan@example.com", "active": false})),
        row(json!({"id": 9, "name": "Edsger Dijkstra", "email": null, "active": true})),
    ]
}

/// Rows of the `orders` fixture table.
pub fn orders_fixture() -> RowSet {
    vec![
        row(json!({"id": 100, "user_id": 1, "total": 12.5, "status": "paid"})),
        row(json!({"id": 101, "user_id": 2, "total": 3, "status": "pending"})),
    ]
}

/// Gateway holding `users` (listed first) and `orders`.
pub fn seeded_gateway() -> InMemoryGateway {
    InMemoryGateway::new()
        .with_table("users", users_fixture())
        .with_table("orders", orders_fixture())
}

/// Gateway holding only `users` with the single row `{id: 1, name: "A"}`.
pub fn single_user_gateway() -> InMemoryGateway {
    InMemoryGateway::new().with_table("users", vec![row(json!({"id": 1, "name": "A"}))])
}

// ============================================================================
// STRATEGIES
// ============================================================================

/// Scalar cell values as the REST service returns them.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[a-zA-Z0-9 @.]{0,16}".prop_map(Value::String),
    ]
}

/// Rows with an integer `id` followed by the given columns.
pub fn row_strategy(columns: &'static [&'static str]) -> impl Strategy<Value = Row> {
    (
        0i64..10_000,
        proptest::collection::vec(scalar_strategy(), columns.len()),
    )
        .prop_map(move |(id, values)| {
            let mut row = Row::new();
            row.insert("id".to_string(), Value::from(id));
            for (column, value) in columns.iter().zip(values) {
                row.insert(column.to_string(), value);
            }
            row
        })
}

/// Row sets of up to `max_len` rows sharing the given columns.
pub fn row_set_strategy(
    columns: &'static [&'static str],
    max_len: usize,
) -> impl Strategy<Value = RowSet> {
    proptest::collection::vec(row_strategy(columns), 0..=max_len)
}

/// Username/password pairs that never equal the fixture credentials.
pub fn wrong_credentials_strategy() -> impl Strategy<Value = (String, String)> {
    prop_oneof![
        // right user, wrong password
        "[ -~]{0,16}".prop_map(|p| (TEST_ADMIN_USERNAME.to_string(), p)),
        // wrong user, right password
        "[ -~]{0,16}".prop_map(|u| (u, TEST_ADMIN_PASSWORD.to_string())),
        // case variations
        Just(("Admin".to_string(), TEST_ADMIN_PASSWORD.to_string())),
        Just((TEST_ADMIN_USERNAME.to_string(), "ADMIN123".to_string())),
        // both random
        ("[ -~]{0,16}", "[ -~]{0,16}"),
    ]
    .prop_filter("must not be the valid pair", |(u, p)| {
        !(u == TEST_ADMIN_USERNAME && p == TEST_ADMIN_PASSWORD)
    })
}

// ============================================================================
// WORKBOOKS
// ============================================================================

/// Cell texts of `sheet` in an `.xlsx` file, header row first.
///
/// Numbers print without a trailing `.0`, so integer ids read back as typed.
pub fn read_sheet(bytes: &[u8], sheet: &str) -> Result<Vec<Vec<String>>, String> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| format!("Unreadable workbook: {}", e))?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| format!("Missing sheet {}: {}", sheet, e))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}
