//! Seed data for `--demo` mode.

use rowdesk_core::{InMemoryGateway, Row, RowSet};
use serde_json::{json, Value};

fn rows(values: Vec<Value>) -> RowSet {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect::<Vec<Row>>()
}

/// In-memory gateway with a small `users` and `orders` table.
pub fn demo_gateway() -> InMemoryGateway {
    InMemoryGateway::new()
        .with_table(
            "users",
            rows(vec![
                json!({"id": 1, "name": "Ada Lovelace", "email": "ada@example.com", "active": true}),
                json!({"id": 2, "name": "Grace Hopper", "email": "grace@example.com", "active": true}),
                json!({"id": 3, "name": "Alan Turing", "email": "alan@example.com", "active": false}),
            ]),
        )
        .with_table(
            "orders",
            rows(vec![
                json!({"id": 1, "user_id": 1, "total": 42.5, "status": "paid"}),
                json!({"id": 2, "user_id": 2, "total": 9.99, "status": "pending"}),
            ]),
        )
}
