//! Dashboard controller
//!
//! Resolves the active table, dispatches write actions to the gateway and
//! assembles row sets for display or export. Nothing here knows about HTTP:
//! every user-visible outcome comes back as a [`Flash`] for the route layer
//! to queue on the session.

use std::sync::Arc;

use rowdesk_core::{
    column_names, export_filename, export_rows, DashboardAction, FilterCriterion, PanelError,
    PanelResult, RowOperation, RowSet, TableGateway, TableName,
};

use crate::config::{OutOfRangePolicy, PanelConfig};
use crate::flash::Flash;

/// Tables offered in the selector. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableListing {
    pub tables: Vec<TableName>,
    /// Set when the listing had to fall back because the service was unreachable.
    pub notice: Option<Flash>,
}

/// Everything the dashboard view shows for one table.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub tables: Vec<TableName>,
    pub table: TableName,
    pub columns: Vec<String>,
    pub rows: RowSet,
    /// Row count before filtering.
    pub total_rows: usize,
    pub criterion: FilterCriterion,
    pub notices: Vec<Flash>,
}

/// A generated spreadsheet, ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct DashboardController {
    gateway: Arc<dyn TableGateway>,
    config: Arc<PanelConfig>,
}

impl DashboardController {
    pub fn new(gateway: Arc<dyn TableGateway>, config: Arc<PanelConfig>) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<dyn TableGateway> {
        &self.gateway
    }

    /// Remote table names the policy admits, or the default table when the
    /// listing fails or comes back empty.
    pub async fn list_tables(&self) -> TableListing {
        let fallback = || vec![self.config.default_table.clone()];

        match self.gateway.list_tables().await {
            Ok(names) => {
                let tables = self.config.table_policy.retain_allowed(names);
                if tables.is_empty() {
                    tracing::debug!("Table listing empty, using default table");
                    return TableListing {
                        tables: fallback(),
                        notice: None,
                    };
                }
                TableListing {
                    tables,
                    notice: None,
                }
            }
            Err(err) if err.is_unreachable() => {
                tracing::warn!(error = %err, "Table listing failed, remote service unreachable");
                TableListing {
                    tables: fallback(),
                    notice: Some(Flash::from(&PanelError::GatewayUnreachable {
                        reason: err.to_string(),
                    })),
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "Table listing failed, using default table");
                TableListing {
                    tables: fallback(),
                    notice: None,
                }
            }
        }
    }

    /// The requested table if given, else the first listed one.
    pub fn resolve_table(
        &self,
        requested: Option<&str>,
        listing: &TableListing,
    ) -> PanelResult<TableName> {
        match requested.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => self.config.table_policy.resolve(name),
            None => Ok(listing
                .tables
                .first()
                .cloned()
                .unwrap_or_else(|| self.config.default_table.clone())),
        }
    }

    /// Run a dashboard write action. `None` means the action was ignored.
    pub async fn dispatch(&self, table: &TableName, form: &[(String, String)]) -> Option<Flash> {
        let action = match DashboardAction::from_form(form) {
            Ok(action) => action,
            Err(err) => {
                tracing::debug!(table = %table, error = %err, "Rejected dashboard action");
                return Some(Flash::warning(err.to_string()));
            }
        };

        let outcome = match &action {
            DashboardAction::Add { fields } => self
                .gateway
                .insert(table, fields)
                .await
                .map(|_| Flash::success("New row added."))
                .map_err(|e| e.into_panel_error(RowOperation::Insert, table)),
            DashboardAction::Update { row_id, fields } => self
                .gateway
                .update(table, *row_id, fields)
                .await
                .map(|_| Flash::success(format!("Row ID {} updated.", row_id)))
                .map_err(|e| e.into_panel_error(RowOperation::Update, table)),
            DashboardAction::Delete { row_id } => self
                .gateway
                .delete(table, *row_id)
                .await
                .map(|_| Flash::success(format!("Row ID {} deleted from {}.", row_id, table)))
                .map_err(|e| e.into_panel_error(RowOperation::Delete, table)),
            DashboardAction::Unrecognized(name) => {
                tracing::debug!(table = %table, action = name.as_str(), "Ignoring unknown action");
                return None;
            }
        };

        match outcome {
            Ok(flash) => {
                tracing::info!(table = %table, action = action.name(), "Dashboard action applied");
                Some(flash)
            }
            Err(err) => {
                tracing::warn!(
                    table = %table,
                    action = action.name(),
                    error = %err,
                    "Dashboard action failed"
                );
                Some(Flash::from(&err))
            }
        }
    }

    /// Fetch every row of `table`.
    pub async fn load_rows(&self, table: &TableName) -> PanelResult<RowSet> {
        self.gateway.fetch_all(table).await.map_err(|err| {
            if err.is_unreachable() {
                tracing::warn!(
                    table = %table,
                    error = %err,
                    "Row fetch failed, remote service unreachable"
                );
            } else {
                tracing::debug!(table = %table, error = %err, "Row fetch failed");
            }
            err.into_panel_error(RowOperation::Select, table)
        })
    }

    /// Apply `criterion`, falling back to the unfiltered rows when the column
    /// index is out of range.
    pub fn filter(&self, rows: RowSet, criterion: &FilterCriterion) -> (RowSet, Option<Flash>) {
        match criterion.apply(&rows) {
            Ok(filtered) => (filtered, None),
            Err(err) => {
                let notice = match self.config.out_of_range {
                    OutOfRangePolicy::Warn => Some(Flash::from(&err)),
                    OutOfRangePolicy::Ignore => None,
                };
                (rows, notice)
            }
        }
    }

    /// Everything needed to render the dashboard for `table`.
    pub async fn load_dashboard(
        &self,
        listing: TableListing,
        table: TableName,
        criterion: FilterCriterion,
    ) -> DashboardData {
        let mut notices: Vec<Flash> = listing.notice.into_iter().collect();

        let rows = match self.load_rows(&table).await {
            Ok(rows) => rows,
            Err(err) => {
                let flash = Flash::from(&err);
                if !notices.contains(&flash) {
                    notices.push(flash);
                }
                RowSet::new()
            }
        };
        let total_rows = rows.len();
        let columns = column_names(&rows).into_iter().map(str::to_string).collect();

        let (rows, notice) = self.filter(rows, &criterion);
        notices.extend(notice);

        DashboardData {
            tables: listing.tables,
            table,
            columns,
            rows,
            total_rows,
            criterion,
            notices,
        }
    }

    /// Build the spreadsheet for `table`. With a criterion the filter is
    /// recomputed here from freshly fetched rows.
    pub async fn export(
        &self,
        table: &TableName,
        criterion: Option<&FilterCriterion>,
    ) -> PanelResult<ExportFile> {
        let rows = self.load_rows(table).await?;
        let rows = match criterion {
            Some(criterion) => match criterion.apply(&rows) {
                Ok(filtered) => filtered,
                Err(err) => {
                    tracing::debug!(table = %table, error = %err, "Export filter ignored");
                    rows
                }
            },
            None => rows,
        };

        let bytes = export_rows(&rows, table.as_str())?;
        Ok(ExportFile {
            filename: export_filename(table, criterion.is_some()),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowdesk_core::{InMemoryGateway, TablePolicy};
    use serde_json::json;

    fn row(value: serde_json::Value) -> rowdesk_core::Row {
        match value {
            serde_json::Value::Object(map) => map,
            _ => rowdesk_core::Row::new(),
        }
    }

    fn controller_with(
        gateway: InMemoryGateway,
        config: PanelConfig,
    ) -> (Arc<InMemoryGateway>, DashboardController) {
        let gateway = Arc::new(gateway);
        let controller = DashboardController::new(gateway.clone(), Arc::new(config));
        (gateway, controller)
    }

    fn users() -> InMemoryGateway {
        InMemoryGateway::new().with_table(
            "users",
            vec![
                row(json!({"id": 1, "name": "Ada"})),
                row(json!({"id": 7, "name": "Alan"})),
            ],
        )
    }

    fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_listing_falls_back_to_default_table() {
        let (gateway, controller) = controller_with(InMemoryGateway::new(), PanelConfig::default());
        let listing = controller.list_tables().await;
        assert_eq!(listing.tables.len(), 1);
        assert_eq!(listing.tables[0].as_str(), "users");
        assert!(listing.notice.is_none());

        gateway.set_offline(true);
        let listing = controller.list_tables().await;
        assert_eq!(listing.tables[0].as_str(), "users");
        assert_eq!(
            listing.notice.map(|f| f.message),
            Some("Remote service unreachable".to_string())
        );
    }

    #[tokio::test]
    async fn test_listing_respects_allowlist() -> PanelResult<()> {
        let config = PanelConfig {
            table_policy: TablePolicy::with_allowlist(vec![TableName::parse("orders")?]),
            default_table: TableName::parse("orders")?,
            ..PanelConfig::default()
        };
        let gateway = users().with_table("orders", vec![row(json!({"id": 1}))]);
        let (_, controller) = controller_with(gateway, config);

        let listing = controller.list_tables().await;
        assert_eq!(listing.tables, vec![TableName::parse("orders")?]);
        assert!(controller.resolve_table(Some("users"), &listing).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_table_defaults_to_first_listed() -> PanelResult<()> {
        let (_, controller) = controller_with(users(), PanelConfig::default());
        let listing = TableListing {
            tables: vec![TableName::parse("orders")?, TableName::parse("users")?],
            notice: None,
        };
        assert_eq!(controller.resolve_table(None, &listing)?.as_str(), "orders");
        assert_eq!(controller.resolve_table(Some(" "), &listing)?.as_str(), "orders");
        assert_eq!(controller.resolve_table(Some("users"), &listing)?.as_str(), "users");
        assert!(controller.resolve_table(Some("users; drop"), &listing).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_dispatch_messages() -> PanelResult<()> {
        let (gateway, controller) = controller_with(users(), PanelConfig::default());
        let table = TableName::parse("users")?;

        let flash = controller
            .dispatch(&table, &form(&[("action", "delete"), ("row_id", "7")]))
            .await;
        assert_eq!(flash, Some(Flash::success("Row ID 7 deleted from users.")));

        let flash = controller
            .dispatch(
                &table,
                &form(&[("action", "update"), ("row_id", "1"), ("name", "Grace")]),
            )
            .await;
        assert_eq!(flash, Some(Flash::success("Row ID 1 updated.")));

        let flash = controller
            .dispatch(&table, &form(&[("action", "add"), ("name", "Edsger")]))
            .await;
        assert_eq!(flash, Some(Flash::success("New row added.")));

        let rows = gateway.rows("users").unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&json!("Grace")));
        Ok(())
    }

    #[tokio::test]
    async fn test_dispatch_without_row_id_makes_no_call() -> PanelResult<()> {
        let (gateway, controller) = controller_with(users(), PanelConfig::default());
        gateway.set_offline(true);
        let table = TableName::parse("users")?;

        let flash = controller
            .dispatch(&table, &form(&[("action", "delete"), ("row_id", "seven")]))
            .await;
        assert!(matches!(flash, Some(Flash { level: crate::flash::FlashLevel::Warning, .. })));

        let flash = controller.dispatch(&table, &form(&[("action", "frobnicate")])).await;
        assert_eq!(flash, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported() -> PanelResult<()> {
        let (_, controller) = controller_with(users(), PanelConfig::default());
        let table = TableName::parse("missing")?;
        let flash = controller
            .dispatch(&table, &form(&[("action", "delete"), ("row_id", "1")]))
            .await;
        assert!(flash.is_some_and(|f| f
            .message
            .starts_with("Database operation delete on missing failed")));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_table_shows_empty_rows() -> PanelResult<()> {
        let (_, controller) = controller_with(users(), PanelConfig::default());
        let listing = controller.list_tables().await;
        let data = controller
            .load_dashboard(listing, TableName::parse("nope")?, FilterCriterion::default())
            .await;
        assert!(data.rows.is_empty());
        assert_eq!(data.notices, vec![Flash::danger("Table 'nope' does not exist!")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_out_of_range_policy() -> PanelResult<()> {
        let criterion = FilterCriterion::new(Some(9), "a");
        let rows = users().rows("users").unwrap_or_default();

        let (_, warn) = controller_with(users(), PanelConfig::default());
        let (kept, notice) = warn.filter(rows.clone(), &criterion);
        assert_eq!(kept, rows);
        assert!(notice.is_some());

        let config = PanelConfig {
            out_of_range: OutOfRangePolicy::Ignore,
            ..PanelConfig::default()
        };
        let (_, ignore) = controller_with(users(), config);
        let (kept, notice) = ignore.filter(rows.clone(), &criterion);
        assert_eq!(kept, rows);
        assert!(notice.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_export_recomputes_filter() -> PanelResult<()> {
        let (_, controller) = controller_with(users(), PanelConfig::default());
        let table = TableName::parse("users")?;

        let file = controller.export(&table, None).await?;
        assert_eq!(file.filename, "users.xlsx");
        assert!(file.bytes.starts_with(b"PK"));

        let criterion = FilterCriterion::new(Some(1), "alan");
        let file = controller.export(&table, Some(&criterion)).await?;
        assert_eq!(file.filename, "users_filtered.xlsx");

        let criterion = FilterCriterion::new(Some(1), "nobody");
        assert_eq!(
            controller.export(&table, Some(&criterion)).await,
            Err(PanelError::EmptyExportSet {
                sheet: "users".to_string()
            })
        );
        Ok(())
    }
}
