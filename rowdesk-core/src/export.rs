//! Spreadsheet export
//!
//! A row set becomes a single `.xlsx` worksheet: a bold header row built
//! from the first row's keys, then one line per row. Cells keep their native
//! type where Excel has one (numbers, booleans) and fall back to text.
//!
//! The layout is computed first ([`SheetLayout`]) and serialized second, so
//! the shape of an export can be inspected without parsing the workbook.

use crate::error::{PanelError, PanelResult};
use crate::row::{column_names, Row};
use crate::table::TableName;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::Value;

/// MIME type of the generated workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Excel row limit, header included.
const MAX_SHEET_ROWS: usize = 1_048_576;

/// Excel column limit.
const MAX_SHEET_COLUMNS: usize = 16_384;

const MAX_SHEET_NAME_CHARS: usize = 31;

/// Integers beyond this magnitude lose precision as an Excel number.
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// One worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl Cell {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Cell::Blank,
            Some(Value::Bool(b)) => Cell::Boolean(*b),
            Some(Value::String(s)) => Cell::Text(s.clone()),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    if i.unsigned_abs() <= MAX_EXACT_INTEGER {
                        return Cell::Number(i as f64);
                    }
                    return Cell::Text(n.to_string());
                }
                if n.is_u64() {
                    return Cell::Text(n.to_string());
                }
                n.as_f64()
                    .map(Cell::Number)
                    .unwrap_or_else(|| Cell::Text(n.to_string()))
            }
            Some(other) => Cell::Text(other.to_string()),
        }
    }
}

/// Worksheet contents ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetLayout {
    /// Lay out `rows` under the first row's columns.
    ///
    /// Refuses an empty row set with [`PanelError::EmptyExportSet`].
    pub fn from_rows(rows: &[Row], sheet_name: &str) -> PanelResult<Self> {
        if rows.is_empty() {
            return Err(PanelError::EmptyExportSet {
                sheet: sheet_name.to_string(),
            });
        }
        if rows.len() + 1 > MAX_SHEET_ROWS {
            return Err(PanelError::ExportFailed {
                reason: format!(
                    "{} rows exceed the worksheet limit of {}",
                    rows.len(),
                    MAX_SHEET_ROWS - 1
                ),
            });
        }

        let headers: Vec<String> = column_names(rows).into_iter().map(str::to_string).collect();
        if headers.len() > MAX_SHEET_COLUMNS {
            return Err(PanelError::ExportFailed {
                reason: format!(
                    "{} columns exceed the worksheet limit of {}",
                    headers.len(),
                    MAX_SHEET_COLUMNS
                ),
            });
        }

        let cells = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|column| Cell::from_value(row.get(column)))
                    .collect()
            })
            .collect();

        Ok(Self {
            name: sanitize_sheet_name(sheet_name),
            headers,
            rows: cells,
        })
    }

    /// Serialize to `.xlsx` bytes.
    pub fn to_xlsx(&self) -> PanelResult<Vec<u8>> {
        self.write_workbook().map_err(|e| PanelError::ExportFailed {
            reason: e.to_string(),
        })
    }

    fn write_workbook(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.name)?;

        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (index, cells) in self.rows.iter().enumerate() {
            let row = (index + 1) as u32;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Blank => {}
                    Cell::Number(n) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                    Cell::Boolean(b) => {
                        worksheet.write_boolean(row, col, *b)?;
                    }
                    Cell::Text(s) => {
                        worksheet.write_string(row, col, s)?;
                    }
                }
            }
        }

        workbook.save_to_buffer()
    }
}

/// Build the `.xlsx` file for `rows` on a sheet called `sheet_name`.
pub fn export_rows(rows: &[Row], sheet_name: &str) -> PanelResult<Vec<u8>> {
    let layout = SheetLayout::from_rows(rows, sheet_name)?;
    let bytes = layout.to_xlsx()?;
    tracing::info!(
        sheet = layout.name.as_str(),
        rows = layout.rows.len(),
        columns = layout.headers.len(),
        bytes = bytes.len(),
        "Built spreadsheet export"
    );
    Ok(bytes)
}

/// Download file name for a table export.
pub fn export_filename(table: &TableName, filtered: bool) -> String {
    if filtered {
        format!("{}_filtered.xlsx", table)
    } else {
        format!("{}.xlsx", table)
    }
}

/// Make `name` acceptable as an Excel worksheet name.
///
/// Excel forbids `[]:*?/\`, leading or trailing apostrophes and names longer
/// than 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let trimmed: String = replaced
        .trim_matches('\'')
        .trim()
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let trimmed = trimmed.trim_end_matches('\'').to_string();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("history") {
        "Sheet1".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<Row> {
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_export_is_refused() {
        assert_eq!(
            export_rows(&[], "users"),
            Err(PanelError::EmptyExportSet {
                sheet: "users".to_string()
            })
        );
    }

    #[test]
    fn test_single_row_layout() -> PanelResult<()> {
        let layout = SheetLayout::from_rows(&rows(vec![json!({"id": 1, "name": "A"})]), "users")?;
        assert_eq!(layout.name, "users");
        assert_eq!(layout.headers, vec!["id", "name"]);
        assert_eq!(
            layout.rows,
            vec![vec![Cell::Number(1.0), Cell::Text("A".to_string())]]
        );
        Ok(())
    }

    #[test]
    fn test_layout_uses_first_row_columns() -> PanelResult<()> {
        let layout = SheetLayout::from_rows(
            &rows(vec![
                json!({"id": 1, "name": "A"}),
                json!({"id": 2, "extra": "ignored"}),
            ]),
            "users",
        )?;
        assert_eq!(layout.headers, vec!["id", "name"]);
        assert_eq!(layout.rows.len(), 2);
        assert_eq!(layout.rows[1], vec![Cell::Number(2.0), Cell::Blank]);
        Ok(())
    }

    #[test]
    fn test_native_cell_types() -> PanelResult<()> {
        let layout = SheetLayout::from_rows(
            &rows(vec![json!({
                "n": 2.5,
                "b": false,
                "s": "x",
                "z": null,
                "big": 9_007_199_254_740_993_i64,
                "obj": {"k": [1]}
            })]),
            "t",
        )?;
        assert_eq!(
            layout.rows[0],
            vec![
                Cell::Number(2.5),
                Cell::Boolean(false),
                Cell::Text("x".to_string()),
                Cell::Blank,
                Cell::Text("9007199254740993".to_string()),
                Cell::Text(r#"{"k":[1]}"#.to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_extreme_integers_become_text() -> PanelResult<()> {
        let layout = SheetLayout::from_rows(
            &rows(vec![json!({
                "min": i64::MIN,
                "max": i64::MAX,
                "edge": -9_007_199_254_740_992_i64,
            })]),
            "t",
        )?;
        assert_eq!(
            layout.rows[0],
            vec![
                Cell::Text(i64::MIN.to_string()),
                Cell::Text(i64::MAX.to_string()),
                Cell::Number(-9_007_199_254_740_992.0),
            ]
        );

        let bytes = export_rows(&rows(vec![json!({"id": i64::MIN, "name": "A"})]), "users")?;
        assert!(bytes.starts_with(b"PK"));
        Ok(())
    }

    #[test]
    fn test_export_produces_zip_container()-> PanelResult<()> {
        let bytes = export_rows(&rows(vec![json!({"id": 1, "name": "A"})]), "users")?;
        assert!(bytes.starts_with(b"PK"));
        Ok(())
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("users"), "users");
        assert_eq!(sanitize_sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name(""), "Sheet1");
        assert_eq!(sanitize_sheet_name("History"), "Sheet1");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).chars().count(), 31);
    }

    #[test]
    fn test_export_filename() -> PanelResult<()> {
        let table = TableName::parse("users")?;
        assert_eq!(export_filename(&table, false), "users.xlsx");
        assert_eq!(export_filename(&table, true), "users_filtered.xlsx");
        Ok(())
    }
}
