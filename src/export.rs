//! Plain CSV export of row objects. Values are written as-is; no quoting.

use std::io::Write;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Header from the first row's keys, then each row's values in its own key order.
pub fn export_csv<W: Write>(rows: &[Map<String, Value>], out: &mut W) -> AppResult<()> {
    let Some(first) = rows.first() else {
        return Err(AppError::user("empty_export", "nothing to export"));
    };
    let header: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    writeln!(out, "{}", header.join(","))?;
    let lines: Vec<String> = rows
        .iter()
        .map(|row| row.values().map(cell).collect::<Vec<_>>().join(","))
        .collect();
    write!(out, "{}", lines.join("\n"))?;
    Ok(())
}

pub fn export_csv_file(rows: &[Map<String, Value>], path: &Path) -> AppResult<()> {
    let mut buf = Vec::new();
    export_csv(rows, &mut buf)?;
    std::fs::write(path, buf)?;
    Ok(())
}

fn cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
