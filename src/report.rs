//! Output formatting for analysis results.
//!
//! Supports two output formats:
//! - Table: coloured terminal output for human readability
//! - JSON: an array of usage records for programmatic consumption

use serde::Serialize;

use crate::aggregate::Summary;
use crate::display::{Display, Style};
use crate::error::AnalyzerError;
use crate::usage::{KeyUsage, UsageType};

/// Locations shown per table row before summarising the rest.
pub const MAX_LOCATIONS: usize = 3;

/// Records to report: everything with `show_all`, otherwise unused only.
pub fn visible(records: &[KeyUsage], show_all: bool) -> Vec<&KeyUsage> {
    records.iter().filter(|r| show_all || !r.is_used).collect()
}

// =============================================================================
// JSON Format
// =============================================================================

/// JSON document for `records`, sorted by key, with one trailing newline.
pub fn render_json(records: &[&KeyUsage]) -> serde_json::Result<String> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));
    let mut json = serde_json::to_string_pretty(&sorted)?;
    json.push('\n');
    Ok(json)
}

pub fn write_json(display: &Display, records: &[&KeyUsage]) -> anyhow::Result<()> {
    display.raw_json(&render_json(records)?);
    Ok(())
}

#[derive(Serialize)]
struct JsonError<'a> {
    error: &'a str,
    detail: String,
}

/// `{"error": kind, "detail": message}` with one trailing newline.
pub fn render_error_json(err: &AnalyzerError) -> String {
    let body = JsonError {
        error: err.kind(),
        detail: err.to_string(),
    };
    let mut json = serde_json::to_string(&body)
        .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", err.kind()));
    json.push('\n');
    json
}

/// Report a fatal error in the selected format.
pub fn write_error(display: &Display, err: &AnalyzerError, json: bool) {
    if json {
        display.raw_json(&render_error_json(err));
    } else {
        display.failure(err.kind(), &err.to_string());
    }
}

// =============================================================================
// Table Format
// =============================================================================

const HEADERS: [&str; 5] = ["KEY", "STATUS", "TYPE", "PATTERN", "LOCATIONS"];

/// Write the usage table followed by a summary line.
pub fn write_table(display: &Display, records: &[&KeyUsage], summary: &Summary) {
    if !records.is_empty() {
        let rows: Vec<[String; 5]> = records.iter().map(|r| table_row(r)).collect();
        let mut widths = HEADERS.map(|h| h.chars().count());
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        display.bold(&join_cells(&HEADERS.map(String::from), &widths));
        for (record, row) in records.iter().zip(&rows) {
            let style = status_style(record.usage_type);
            let line = join_cells(row, &widths);
            display.info(&display.paint(&line, style));
        }
        display.info("");
    }

    if summary.unused > 0 {
        display.warning(&format!(
            "{} of {} keys unused ({} direct, {} via pattern)",
            summary.unused, summary.total, summary.direct, summary.pattern
        ));
    } else {
        display.success(&format!(
            "All {} keys are used ({} direct, {} via pattern)",
            summary.total, summary.direct, summary.pattern
        ));
    }
}

fn table_row(record: &KeyUsage) -> [String; 5] {
    let status = if record.is_used { "used" } else { "unused" };
    let key = if record.is_rollup() {
        format!("{} ({} keys)", record.key, record.child_keys.len())
    } else {
        record.key.clone()
    };
    [
        key,
        status.to_string(),
        record.usage_type.to_string(),
        record.pattern_name.clone(),
        format_locations(record),
    ]
}

/// `file:line` for the first few locations, then `+K more`.
fn format_locations(record: &KeyUsage) -> String {
    let mut parts: Vec<String> = record
        .locations
        .iter()
        .take(MAX_LOCATIONS)
        .map(|l| format!("{}:{}", l.file, l.line))
        .collect();
    if record.locations.len() > MAX_LOCATIONS {
        parts.push(format!("+{} more", record.locations.len() - MAX_LOCATIONS));
    }
    parts.join(", ")
}

fn join_cells(cells: &[String; 5], widths: &[usize; 5]) -> String {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i + 1 == cells.len() {
            line.push_str(cell);
        } else {
            let pad = width - cell.chars().count();
            line.push_str(cell);
            line.push_str(&" ".repeat(pad + 2));
        }
    }
    line.trim_end().to_string()
}

fn status_style(usage_type: UsageType) -> Style {
    match usage_type {
        UsageType::Direct => Style::Green,
        UsageType::Pattern => Style::Yellow,
        UsageType::Unused => Style::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::display::tests::SharedBuf;
    use crate::display::DisplayOptions;
    use crate::usage::Location;
    use std::io;
    use std::path::PathBuf;

    fn loc(line: usize) -> Location {
        Location {
            file: "templates/deployment.yaml".to_string(),
            line,
            pattern: "direct".to_string(),
        }
    }

    fn capture(no_colors: bool) -> (Display, SharedBuf) {
        let out = SharedBuf::default();
        let display = Display::with_writers(
            DisplayOptions {
                no_colors,
                ..Default::default()
            },
            Box::new(out.clone()),
            Box::new(io::sink()),
        );
        (display, out)
    }

    #[test]
    fn test_visible_filters_used() {
        let records = vec![
            KeyUsage::direct("a", vec![loc(1)]),
            KeyUsage::unused("b"),
        ];
        assert_eq!(visible(&records, false).len(), 1);
        assert_eq!(visible(&records, true).len(), 2);
    }

    #[test]
    fn test_json_is_sorted_with_single_newline() {
        let b = KeyUsage::unused("b.key");
        let a = KeyUsage::direct("a.key", vec![loc(4)]);
        let json = render_json(&[&b, &a]).unwrap();

        assert!(json.ends_with("]\n"));
        assert!(!json.ends_with("\n\n"));
        let parsed: Vec<KeyUsage> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].key, "a.key");
        assert_eq!(parsed[1].key, "b.key");
        assert_eq!(parsed, vec![a, b]);
    }

    #[test]
    fn test_empty_json_array() {
        assert_eq!(render_json(&[]).unwrap(), "[]\n");
    }

    #[test]
    fn test_error_json() {
        let err = AnalyzerError::BackendMissing("rg, grep".to_string());
        let json = render_error_json(&err);
        assert_eq!(
            json,
            "{\"error\":\"BackendMissing\",\"detail\":\"no search backend found on PATH (looked for rg, grep)\"}\n"
        );

        let err = AnalyzerError::FileMissing(PathBuf::from("values.yaml"));
        let value: serde_json::Value = serde_json::from_str(&render_error_json(&err)).unwrap();
        assert_eq!(value["error"], "FileMissing");
    }

    #[test]
    fn test_locations_overflow() {
        let record = KeyUsage::direct("a", (1..=5).map(loc).collect());
        assert_eq!(
            format_locations(&record),
            "templates/deployment.yaml:1, templates/deployment.yaml:2, templates/deployment.yaml:3, +2 more"
        );
    }

    #[test]
    fn test_table_output() {
        let records = aggregate(vec![
            KeyUsage::unused("resources.limits.cpu"),
            KeyUsage::unused("resources.limits.memory"),
        ]);
        let summary = Summary::from_usages(&records);
        let shown = visible(&records, false);

        let (display, out) = capture(true);
        write_table(&display, &shown, &summary);
        let text = out.contents();

        assert!(text.starts_with("KEY"));
        assert!(text.contains("resources.limits (2 keys)"));
        assert!(text.contains("resources.limits.cpu"));
        assert!(text.contains("2 of 2 keys unused"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_table_all_used() {
        let records = vec![KeyUsage::direct("a", vec![loc(1)])];
        let summary = Summary::from_usages(&records);

        let (display, out) = capture(true);
        write_table(&display, &visible(&records, false), &summary);
        assert_eq!(out.contents(), "✓ All 1 keys are used (1 direct, 0 via pattern)\n");
    }
}
