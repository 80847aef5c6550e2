use std::path::Path;

use chrono::{Local, TimeZone};
use serde_json::Value;

use crate::error::Result;

pub const PLACEHOLDER: &str = "N/A";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One table row extracted from a history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub step: String,
    pub action: String,
    pub result: String,
    pub timestamp: String,
}

impl ReportRow {
    /// Pull the row fields out of an entry, substituting [`PLACEHOLDER`]
    /// for anything missing or of the wrong type.
    pub fn from_entry(entry: &Value) -> Self {
        Self {
            step: entry
                .pointer("/metadata/step_number")
                .and_then(scalar_text)
                .unwrap_or_else(|| PLACEHOLDER.into()),
            action: entry
                .pointer("/model_output/current_state/next_goal")
                .and_then(scalar_text)
                .unwrap_or_else(|| PLACEHOLDER.into()),
            result: entry
                .pointer("/result/0/extracted_content")
                .and_then(scalar_text)
                .unwrap_or_else(|| PLACEHOLDER.into()),
            timestamp: entry
                .pointer("/metadata/step_start_time")
                .and_then(Value::as_f64)
                .and_then(format_local_time)
                .unwrap_or_else(|| PLACEHOLDER.into()),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn format_local_time(epoch_secs: f64) -> Option<String> {
    if !epoch_secs.is_finite() {
        return None;
    }
    let secs = epoch_secs.floor();
    let nanos = ((epoch_secs - secs) * 1e9) as u32;
    Local
        .timestamp_opt(secs as i64, nanos)
        .earliest()
        .map(|t| t.format(TIME_FORMAT).to_string())
}

/// Rows for every entry under the document's top-level `history` list.
pub fn rows(document: &Value) -> Vec<ReportRow> {
    document
        .get("history")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(ReportRow::from_entry).collect())
        .unwrap_or_default()
}

/// Render a run-history document as a standalone HTML page.
pub fn render_html(document: &Value) -> String {
    let mut rows_html = String::new();
    for row in rows(document) {
        rows_html.push_str(&format!(
            r#"
        <tr>
            <td>{}</td>
            <td>{}</td>
            <td>{}</td>
            <td>{}</td>
        </tr>"#,
            html_escape(&row.step),
            html_escape(&row.action),
            html_escape(&row.result),
            html_escape(&row.timestamp),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Test Report</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ border: 1px solid black; padding: 8px; text-align: left; vertical-align: top; }}
        th {{ background-color: #f2f2f2; }}
        td {{ white-space: pre-wrap; }}
    </style>
</head>
<body>
    <h1>Test Execution Report</h1>
    <p>Generated on: {generated}</p>
    <table>
        <tr>
            <th>Step</th>
            <th>Action</th>
            <th>Result</th>
            <th>Timestamp</th>
        </tr>{rows_html}
    </table>
</body>
</html>
"#,
        generated = Local::now().format(TIME_FORMAT),
    )
}

/// Read the history at `history_path` and write the HTML report to `output_path`.
pub fn render(history_path: impl AsRef<Path>, output_path: impl AsRef<Path>) -> Result<()> {
    let bytes = std::fs::read(history_path.as_ref())?;
    let document: Value = serde_json::from_slice(&bytes)?;
    let html = render_html(&document);
    std::fs::write(output_path.as_ref(), html)?;
    tracing::info!(path = %output_path.as_ref().display(), "report generated");
    Ok(())
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
