//! Output formatting and persistence for standardized tables and reports.
//!
//! This is the render boundary: zero cells and missing means become blank
//! cells here and nowhere else.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::parser::Period;
use crate::report::types::{Column, DailyMatrix, PeriodMeans, StreetRow};
use crate::report::zoned::{ZonedEntry, ZonedMatrix};
use crate::table::Table;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a table as CSV, header first, replacing any existing file.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<()> {
    create_parent(path)?;
    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.len(), "Table written");
    Ok(())
}

/// The daily matrix as CSV: header, one line per street, then the totals line.
pub fn matrix_csv_bytes(matrix: &DailyMatrix) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(matrix_header(&matrix.columns, None))?;

    for row in &matrix.rows {
        writer.write_record(street_line(None, row))?;
    }
    writer.write_record(totals_line(None, &matrix.totals.cells, &matrix.totals.mean_by_period))?;

    Ok(writer.into_inner()?)
}

pub fn write_matrix_csv(path: &Path, matrix: &DailyMatrix) -> Result<()> {
    write_bytes(path, &matrix_csv_bytes(matrix)?)?;
    info!(path = %path.display(), rows = matrix.rows.len(), "Matrix written");
    Ok(())
}

/// The zone-grouped matrix as CSV, with a zone column and subtotal lines.
pub fn zoned_csv_bytes(zoned: &ZonedMatrix) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    let header = matrix_header(&zoned.columns, Some("Quadra"));
    let header_len = header.len();
    writer.write_record(header)?;

    for entry in &zoned.entries {
        let line = match entry {
            ZonedEntry::Street { zone, row } => street_line(Some(zone.as_deref().unwrap_or("")), row),
            ZonedEntry::Subtotal {
                zone,
                cells,
                mean_by_period,
            } => {
                let mut line = vec![String::new(), zone.clone(), "Subtotal".to_string()];
                line.extend(cells.iter().map(|v| blank_zero(*v)));
                line.extend(means(mean_by_period));
                line.push(String::new());
                line
            }
        };
        writer.write_record(line)?;
    }
    writer.write_record(totals_line(Some(""), &zoned.totals.cells, &zoned.totals.mean_by_period))?;

    let mut average = vec![
        String::new(),
        String::new(),
        "Média".to_string(),
        number(zoned.average),
    ];
    average.resize(header_len, String::new());
    writer.write_record(average)?;

    Ok(writer.into_inner()?)
}

pub fn write_zoned_csv(path: &Path, zoned: &ZonedMatrix) -> Result<()> {
    write_bytes(path, &zoned_csv_bytes(zoned)?)?;
    info!(path = %path.display(), entries = zoned.entries.len(), "Zoned matrix written");
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    write_bytes(path, text.as_bytes())?;
    info!(path = %path.display(), "Text written");
    Ok(())
}

pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    write_bytes(path, &serde_json::to_vec_pretty(value)?)?;
    info!(path = %path.display(), "JSON written");
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    create_parent(path)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn matrix_header(columns: &[Column], zone_label: Option<&str>) -> Vec<String> {
    let mut header = vec!["Ordem".to_string()];
    header.extend(zone_label.map(str::to_string));
    header.push("Logradouro".to_string());
    header.extend(
        columns
            .iter()
            .map(|c| format!("{} {}", c.period.label(), c.day.format("%d/%m"))),
    );
    header.extend(Period::ALL.iter().map(|p| format!("Média {}", p.name())));
    header.push("Acima do limiar".to_string());
    header
}

fn street_line(zone: Option<&str>, row: &StreetRow) -> Vec<String> {
    let mut line = vec![row.order.map(|o| o.to_string()).unwrap_or_default()];
    line.extend(zone.map(str::to_string));
    line.push(row.street.clone());
    line.extend(row.cells.iter().map(|v| blank_zero(*v)));
    line.extend(means(&row.mean_by_period));
    line.push(if row.count_above_threshold > 0 {
        row.count_above_threshold.to_string()
    } else {
        String::new()
    });
    line
}

fn totals_line(zone: Option<&str>, cells: &[f64], mean_by_period: &PeriodMeans) -> Vec<String> {
    let mut line = vec![String::new()];
    line.extend(zone.map(str::to_string));
    line.push("Total".to_string());
    line.extend(cells.iter().map(|v| blank_zero(*v)));
    line.extend(means(mean_by_period));
    line.push(String::new());
    line
}

fn means(means: &PeriodMeans) -> impl Iterator<Item = String> + '_ {
    Period::ALL
        .into_iter()
        .map(move |p| means.get(p).map(number).unwrap_or_default())
}

fn blank_zero(value: f64) -> String {
    if value == 0.0 {
        String::new()
    } else {
        number(value)
    }
}

/// Whole numbers without a decimal point.
fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
