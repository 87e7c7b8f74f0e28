//! HTML rendering for the login page and the dashboard.
//!
//! Pages are assembled as strings. Every value that came from a user or the
//! remote service goes through [`escape_html`].

use std::fmt::Write;

use rowdesk_core::{
    cell_text, FilterCriterion, TableName, FIELD_NAME_FIELD, FIELD_VALUE_FIELD, PRIMARY_KEY,
};

use crate::controller::DashboardData;
use crate::flash::Flash;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem; color: #222; }
h1 { font-size: 1.4rem; }
table { border-collapse: collapse; margin-top: 1rem; }
th, td { border: 1px solid #ccc; padding: 0.25rem 0.5rem; }
th { background: #f3f3f3; }
td input { width: 10rem; }
.bar { display: flex; gap: 1rem; align-items: center; flex-wrap: wrap; }
.flash { padding: 0.5rem 1rem; margin: 0.25rem 0; border-radius: 4px; }
.flash-success { background: #e6f4ea; }
.flash-danger { background: #fce8e6; }
.flash-warning { background: #fef7e0; }
.flash-info { background: #e8f0fe; }
"#;

/// Escape text for use in element content and quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

fn render_flashes(out: &mut String, flashes: &[Flash]) {
    for flash in flashes {
        let _ = writeln!(
            out,
            "<div class=\"flash {}\">{}</div>",
            flash.level.css_class(),
            escape_html(&flash.message)
        );
    }
}

pub fn render_login(flashes: &[Flash]) -> String {
    let mut body = String::from("<h1>rowdesk</h1>\n");
    render_flashes(&mut body, flashes);
    body.push_str(
        "<form method=\"post\" action=\"/login\">\n\
         <p><label>Username <input name=\"username\" autocomplete=\"username\" required></label></p>\n\
         <p><label>Password <input name=\"password\" type=\"password\" \
         autocomplete=\"current-password\" required></label></p>\n\
         <p><button type=\"submit\">Log in</button></p>\n\
         </form>\n",
    );
    page("Login", &body)
}

// ============================================================================
// DASHBOARD
// ============================================================================

/// Query string addressing `table` with an optional filter.
pub fn table_query(table: &TableName, criterion: Option<&FilterCriterion>) -> String {
    let mut query = format!("table={}", urlencoding::encode(table.as_str()));
    if let Some(criterion) = criterion {
        if let Some(index) = criterion.column_index {
            let _ = write!(query, "&filter_col_index={}", index);
        }
        let _ = write!(
            query,
            "&filter_search_value={}",
            urlencoding::encode(&criterion.search)
        );
    }
    query
}

pub fn render_dashboard(data: &DashboardData, username: &str, flashes: &[Flash]) -> String {
    let table = escape_html(data.table.as_str());
    let mut body = String::new();

    let _ = writeln!(
        body,
        "<div class=\"bar\"><h1>Table: {}</h1><span>Logged in as {}</span>\
         <a href=\"/logout\">Log out</a></div>",
        table,
        escape_html(username)
    );
    render_flashes(&mut body, flashes);

    render_table_selector(&mut body, data);
    render_filter_form(&mut body, data);
    render_export_links(&mut body, data);

    if data.columns.is_empty() {
        body.push_str("<p>No rows.</p>\n");
        render_free_form_add(&mut body, data);
    } else {
        render_rows(&mut body, data);
        render_add_form(&mut body, data);
    }

    page(&format!("{} - rowdesk", data.table), &body)
}

fn render_table_selector(out: &mut String, data: &DashboardData) {
    out.push_str("<form class=\"bar\" method=\"get\" action=\"/dashboard\">\n<select name=\"table\">\n");
    for name in &data.tables {
        let selected = if *name == data.table { " selected" } else { "" };
        let escaped = escape_html(name.as_str());
        let _ = writeln!(out, "<option value=\"{}\"{}>{}</option>", escaped, selected, escaped);
    }
    out.push_str("</select>\n<button type=\"submit\">Open</button>\n</form>\n");
}

fn render_filter_form(out: &mut String, data: &DashboardData) {
    if data.columns.is_empty() {
        return;
    }
    let _ = writeln!(
        out,
        "<form class=\"bar\" method=\"get\" action=\"/dashboard\">\n\
         <input type=\"hidden\" name=\"table\" value=\"{}\">\n<select name=\"filter_col_index\">",
        escape_html(data.table.as_str())
    );
    for (index, column) in data.columns.iter().enumerate() {
        let selected = if data.criterion.column_index == Some(index) {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "<option value=\"{}\"{}>{}</option>",
            index,
            selected,
            escape_html(column)
        );
    }
    let _ = writeln!(
        out,
        "</select>\n<input name=\"filter_search_value\" value=\"{}\" placeholder=\"contains...\">\n\
         <button type=\"submit\">Filter</button>\n<a href=\"/dashboard?{}\">Clear</a>\n</form>",
        escape_html(&data.criterion.search),
        escape_html(&table_query(&data.table, None))
    );
    if data.criterion.is_active() {
        let _ = writeln!(
            out,
            "<p>Showing {} of {} rows.</p>",
            data.rows.len(),
            data.total_rows
        );
    }
}

fn render_export_links(out: &mut String, data: &DashboardData) {
    let _ = write!(
        out,
        "<div class=\"bar\"><a href=\"/export_excel?{}\">Export to Excel</a>",
        escape_html(&table_query(&data.table, None))
    );
    if data.criterion.is_active() {
        let _ = write!(
            out,
            "<a href=\"/export_excel_filtered_manual?{}\">Export filtered rows</a>",
            escape_html(&table_query(&data.table, Some(&data.criterion)))
        );
    }
    out.push_str("</div>\n");
}

fn render_rows(out: &mut String, data: &DashboardData) {
    let action = format!("/dashboard/{}", urlencoding::encode(data.table.as_str()));

    out.push_str("<table>\n<thead><tr>");
    for column in &data.columns {
        let _ = write!(out, "<th>{}</th>", escape_html(column));
    }
    out.push_str("<th>Actions</th></tr></thead>\n<tbody>\n");

    for (index, row) in data.rows.iter().enumerate() {
        let form_id = format!("row-{}", index);
        out.push_str("<tr>");
        for column in &data.columns {
            let value = escape_html(&cell_text(row.get(column)));
            if column == PRIMARY_KEY {
                let _ = write!(out, "<td>{}</td>", value);
            } else {
                let _ = write!(
                    out,
                    "<td><input form=\"{}\" name=\"{}\" value=\"{}\"></td>",
                    form_id,
                    escape_html(column),
                    value
                );
            }
        }
        let row_id = escape_html(&cell_text(row.get(PRIMARY_KEY)));
        let _ = writeln!(
            out,
            "<td><form id=\"{}\" method=\"post\" action=\"{}\">\
             <input type=\"hidden\" name=\"row_id\" value=\"{}\">\
             <button name=\"action\" value=\"update\">Update</button> \
             <button name=\"action\" value=\"delete\">Delete</button>\
             </form></td></tr>",
            form_id,
            escape_html(&action),
            row_id
        );
    }
    out.push_str("</tbody>\n</table>\n");
}

fn render_add_form(out: &mut String, data: &DashboardData) {
    let _ = writeln!(
        out,
        "<h2>Add row</h2>\n<form class=\"bar\" method=\"post\" action=\"/dashboard/{}\">\n\
         <input type=\"hidden\" name=\"action\" value=\"add\">",
        escape_html(&urlencoding::encode(data.table.as_str()))
    );
    for column in data.columns.iter().filter(|c| c.as_str() != PRIMARY_KEY) {
        let escaped = escape_html(column);
        let _ = writeln!(
            out,
            "<label>{} <input name=\"{}\"></label>",
            escaped, escaped
        );
    }
    out.push_str("<button type=\"submit\">Add</button>\n</form>\n");
}

/// Blank column/value pairs offered when a table has no rows yet.
const FREE_FORM_PAIRS: usize = 4;

fn render_free_form_add(out: &mut String, data: &DashboardData) {
    let _ = writeln!(
        out,
        "<h2>Add row</h2>\n<form method=\"post\" action=\"/dashboard/{}\">\n\
         <input type=\"hidden\" name=\"action\" value=\"add\">",
        escape_html(&urlencoding::encode(data.table.as_str()))
    );
    for _ in 0..FREE_FORM_PAIRS {
        let _ = writeln!(
            out,
            "<div class=\"bar\"><input name=\"{}\" placeholder=\"column\">\
             <input name=\"{}\" placeholder=\"value\"></div>",
            FIELD_NAME_FIELD, FIELD_VALUE_FIELD
        );
    }
    out.push_str("<button type=\"submit\">Add</button>\n</form>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowdesk_core::{PanelResult, Row};
    use serde_json::json;

    fn data() -> PanelResult<DashboardData> {
        let rows: Vec<Row> = [
            json!({"id": 1, "name": "<b>Ada</b>"}),
            json!({"id": 7, "name": "Alan"}),
        ]
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
        Ok(DashboardData {
            tables: vec![TableName::parse("users")?, TableName::parse("orders")?],
            table: TableName::parse("users")?,
            columns: vec!["id".to_string(), "name".to_string()],
            total_rows: rows.len(),
            rows,
            criterion: FilterCriterion::default(),
            notices: Vec::new(),
        })
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_login_page_shows_flashes() {
        let html = render_login(&[Flash::danger("Invalid credentials")]);
        assert!(html.contains("Invalid credentials"));
        assert!(html.contains("action=\"/login\""));
    }

    #[test]
    fn test_dashboard_escapes_cells() -> PanelResult<()> {
        let html = render_dashboard(&data()?, "admin", &[]);
        assert!(html.contains("&lt;b&gt;Ada&lt;/b&gt;"));
        assert!(!html.contains("<b>Ada</b>"));
        Ok(())
    }

    #[test]
    fn test_dashboard_row_forms() -> PanelResult<()> {
        let html = render_dashboard(&data()?, "admin", &[Flash::success("New row added.")]);
        assert!(html.contains("New row added."));
        assert!(html.contains("<option value=\"users\" selected>users</option>"));
        assert!(html.contains("name=\"row_id\" value=\"7\""));
        assert!(html.contains("action=\"/dashboard/users\""));
        assert!(html.contains("href=\"/export_excel?table=users\""));
        assert!(!html.contains("export_excel_filtered_manual"));
        Ok(())
    }

    #[test]
    fn test_filtered_export_link() -> PanelResult<()> {
        let mut data = data()?;
        data.criterion = FilterCriterion::new(Some(1), "a&b");
        let html = render_dashboard(&data, "admin", &[]);
        assert!(html.contains(
            "/export_excel_filtered_manual?table=users&amp;filter_col_index=1&amp;filter_search_value=a%26b"
        ));
        Ok(())
    }

    #[test]
    fn test_empty_table() -> PanelResult<()> {
        let mut data = data()?;
        data.columns.clear();
        data.rows.clear();
        let html = render_dashboard(&data, "admin", &[]);
        assert!(html.contains("No rows."));
        assert!(html.contains("Add row"));
        assert!(html.contains("name=\"action\" value=\"add\""));
        assert_eq!(html.matches("name=\"field_name\"").count(), FREE_FORM_PAIRS);
        assert_eq!(html.matches("name=\"field_value\"").count(), FREE_FORM_PAIRS);
        assert!(!html.contains("<table>"));
        Ok(())
    }
}
