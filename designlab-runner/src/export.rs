//! CSV and JSON export — the file boundary of the pipeline.
//!
//! CSV cells are typed on read: empty and `NA` cells become missing, then
//! integer, float, and bool parses are tried in that order, and anything
//! else stays a string. Missing cells write back as empty fields.

use std::io;
use std::path::Path;

use thiserror::Error;

use designlab_core::table::Table;
use designlab_core::value::Value;

use crate::diagnose::Diagnosis;

/// Errors from table import/export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Parse one CSV cell into a typed value.
pub fn parse_cell(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() || raw == "NA" {
        return Value::Missing;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::num(f);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(raw.to_string()),
    }
}

/// Format one value as a CSV cell; missing becomes an empty field.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Missing => String::new(),
        Value::Num(v) if v.is_nan() => String::new(),
        other => other.to_string(),
    }
}

/// Read a table from a CSV file (first row is the header).
pub fn read_table_csv(path: &Path) -> Result<Table, ExportError> {
    read_table(csv::Reader::from_path(path)?)
}

/// Read a table from CSV text (tests and stdin use this).
pub fn read_table_csv_str(text: &str) -> Result<Table, ExportError> {
    read_table(csv::Reader::from_reader(text.as_bytes()))
}

fn read_table<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Table, ExportError> {
    let headers = reader.headers()?.clone();
    let mut table = Table::new(headers.iter().collect::<Vec<_>>());
    for record in reader.records() {
        let record = record?;
        let row: Vec<Value> = (0..headers.len())
            .map(|i| parse_cell(record.get(i).unwrap_or("")))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

/// Write a table to a CSV file.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    write_table(table, &mut writer)
}

/// Render a table as CSV text.
pub fn table_to_csv_string(table: &Table) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_table(table, &mut writer)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

fn write_table<W: io::Write>(
    table: &Table,
    writer: &mut csv::Writer<W>,
) -> Result<(), ExportError> {
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(format_cell))?;
    }
    writer.flush()?;
    Ok(())
}

/// Render a full diagnosis as pretty JSON.
pub fn diagnosis_to_json(diagnosis: &Diagnosis) -> serde_json::Result<String> {
    serde_json::to_string_pretty(diagnosis)
}
