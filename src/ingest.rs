//! Turns a loaded [`Table`] into cleaned [`CountRecord`]s, or into a
//! standardized copy of the table itself.
//!
//! Street and period cells are standardized in place (the canonical address
//! replaces the raw text). [`ingest`] feeds the report: rows whose date or
//! count cannot be read are dropped and counted in [`IngestStats`].
//! [`standardize`] only rewrites street and period, keeping every row and
//! column.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::parser::{ParsedAddress, Period, normalize_period, parse_address};
use crate::stats::IngestStats;
use crate::table::Table;

pub const STREET_COLUMNS: &[&str] = &["Logradouro", "Endereço", "logradouro"];
pub const PERIOD_COLUMNS: &[&str] = &["Período", "periodo"];
pub const DATE_COLUMNS: &[&str] = &["Data", "data"];
pub const COUNT_COLUMNS: &[&str] = &["Qtd. pessoas", "Quantidade", "qtd_pessoas"];
pub const TEAM_COLUMNS: &[&str] = &["Equipe"];

/// Derived address columns appended by [`standardize`].
pub const ADDRESS_PART_COLUMNS: [&str; 4] = [
    "tipo_logradouro",
    "nome_logradouro",
    "numero_logradouro",
    "complemento_logradouro",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// One cleaned observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRecord {
    pub team: Option<String>,
    pub date: NaiveDate,
    pub address: ParsedAddress,
    pub period: String,
    pub count: f64,
}

impl CountRecord {
    /// Canonical street, empty when the row had no street.
    pub fn street(&self) -> &str {
        &self.address.canonical
    }

    pub fn period_key(&self) -> Option<Period> {
        Period::classify(&self.period)
    }
}

/// Cleaned records plus the quality counters gathered while producing them.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub records: Vec<CountRecord>,
    pub stats: IngestStats,
    pub has_street: bool,
    pub has_period: bool,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    street: Option<usize>,
    period: Option<usize>,
    date: usize,
    count: usize,
    team: Option<usize>,
}

impl Columns {
    fn resolve(table: &Table) -> Result<Self, IngestError> {
        let street = table.column(STREET_COLUMNS);
        let period = table.column(PERIOD_COLUMNS);
        let date = table.column(DATE_COLUMNS);
        let count = table.column(COUNT_COLUMNS);

        let mut missing = Vec::new();
        if street.is_none() && period.is_none() {
            missing.push("Logradouro".to_string());
            missing.push("Período".to_string());
        }
        if date.is_none() {
            missing.push("Data".to_string());
        }
        if count.is_none() {
            missing.push("Qtd. pessoas".to_string());
        }

        match (date, count) {
            (Some(date), Some(count)) if missing.is_empty() => Ok(Self {
                street,
                period,
                date,
                count,
                team: table.column(TEAM_COLUMNS),
            }),
            _ => Err(IngestError::MissingColumns { missing }),
        }
    }
}

/// Parses every row of `table`.
///
/// # Errors
///
/// Returns [`IngestError::MissingColumns`] when neither a street nor a period
/// column exists, or when the date or count column is absent.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn ingest(table: &Table) -> Result<Ingested, IngestError> {
    let columns = Columns::resolve(table)?;
    let mut stats = IngestStats {
        total_rows: table.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(table.len());

    for (idx, row) in table.rows.iter().enumerate() {
        let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

        let address = columns
            .street
            .map(|col| parse_address(cell(col)))
            .unwrap_or_default();
        stats.record_address(&address);

        let period = columns
            .period
            .map(|col| normalize_period(cell(col)))
            .unwrap_or_default();
        stats.record_period(&period);

        let Some(date) = parse_date(cell(columns.date)) else {
            debug!(row = idx, value = cell(columns.date), "Dropping row with unparsable date");
            stats.dropped_bad_date += 1;
            continue;
        };

        let Some(count) = parse_count(cell(columns.count)) else {
            debug!(row = idx, value = cell(columns.count), "Dropping row with unparsable count");
            stats.dropped_bad_count += 1;
            continue;
        };

        let team = columns
            .team
            .map(cell)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        records.push(CountRecord {
            team,
            date,
            address,
            period,
            count,
        });
    }

    stats.kept_rows = records.len();

    if stats.dropped_rows() > 0 {
        warn!(
            dropped_bad_date = stats.dropped_bad_date,
            dropped_bad_count = stats.dropped_bad_count,
            "Rows dropped during ingestion"
        );
    }
    info!(
        total = stats.total_rows,
        kept = stats.kept_rows,
        with_type = stats.with_type,
        with_number = stats.with_number,
        with_period = stats.with_period,
        "Ingestion complete"
    );

    Ok(Ingested {
        records,
        stats,
        has_street: columns.street.is_some(),
        has_period: columns.period.is_some(),
    })
}

/// A table whose street and period cells were standardized.
#[derive(Debug, Clone, Default)]
pub struct Standardized {
    pub table: Table,
    pub stats: IngestStats,
    pub has_street: bool,
    pub has_period: bool,
}

/// Standardizes street and period cells over every row of `table`.
///
/// The canonical address replaces the street cell and its parts fill the
/// [`ADDRESS_PART_COLUMNS`]. Output columns are team, date, street, period,
/// count and the address parts (those present), then every other column in
/// input order.
///
/// # Errors
///
/// Returns [`IngestError::MissingColumns`] when neither a street nor a period
/// column exists.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn standardize(table: &Table) -> Result<Standardized, IngestError> {
    let street = table.column(STREET_COLUMNS);
    let period = table.column(PERIOD_COLUMNS);
    if street.is_none() && period.is_none() {
        return Err(IngestError::MissingColumns {
            missing: vec!["Logradouro".to_string(), "Período".to_string()],
        });
    }

    let mut headers = table.headers.clone();
    let parts: Vec<usize> = match street {
        Some(_) => ADDRESS_PART_COLUMNS
            .iter()
            .map(|name| {
                let existing = headers.iter().position(|h| h == name);
                existing.unwrap_or_else(|| {
                    headers.push(name.to_string());
                    headers.len() - 1
                })
            })
            .collect(),
        None => Vec::new(),
    };

    let mut stats = IngestStats {
        total_rows: table.len(),
        kept_rows: table.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(table.len());

    for raw in &table.rows {
        let mut row = raw.clone();
        row.resize(headers.len(), String::new());

        if let Some(col) = street {
            let address = parse_address(&row[col]);
            stats.record_address(&address);
            let values = [
                &address.street_type,
                &address.name,
                &address.number,
                &address.complement,
            ];
            for (idx, value) in parts.iter().zip(values) {
                row[*idx] = value.clone();
            }
            row[col] = address.canonical;
        }

        if let Some(col) = period {
            let normalized = normalize_period(&row[col]);
            stats.record_period(&normalized);
            row[col] = normalized;
        }

        rows.push(row);
    }

    let mut order: Vec<usize> = [
        table.column(TEAM_COLUMNS),
        table.column(DATE_COLUMNS),
        street,
        period,
        table.column(COUNT_COLUMNS),
    ]
    .into_iter()
    .flatten()
    .chain(parts.iter().copied())
    .collect();
    for idx in 0..headers.len() {
        if !order.contains(&idx) {
            order.push(idx);
        }
    }

    let table = Table::new(
        order.iter().map(|&i| headers[i].clone()).collect(),
        rows.into_iter()
            .map(|row| order.iter().map(|&i| row[i].clone()).collect())
            .collect(),
    );

    info!(
        rows = stats.total_rows,
        with_type = stats.with_type,
        with_number = stats.with_number,
        with_period = stats.with_period,
        "Standardization complete"
    );

    Ok(Standardized {
        table,
        stats,
        has_street: street.is_some(),
        has_period: period.is_some(),
    })
}

/// Reads a date in any of the formats the field spreadsheets use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Reads a non-negative people count; `,` is accepted as decimal separator.
pub fn parse_count(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_standardizes_street_and_period() {
        let table = table(
            &["Equipe", "Data", "Logradouro", "Período", "Qtd. pessoas"],
            &[&["A", "01/01/2024", "rua  Aurora,50", "Madrugada - 05h", "12"]],
        );

        let ingested = ingest(&table).unwrap();
        let record = &ingested.records[0];

        assert_eq!(record.street(), "Rua Aurora, 50");
        assert_eq!(record.address.number, "50");
        assert_eq!(record.period, "05h - Madrugada");
        assert_eq!(record.period_key(), Some(Period::Madrugada));
        assert_eq!(record.team.as_deref(), Some("A"));
        assert_eq!(record.count, 12.0);
    }

    #[test]
    fn test_missing_street_and_period_is_fatal() {
        let table = table(&["Data", "Qtd. pessoas"], &[&["01/01/2024", "3"]]);

        match ingest(&table) {
            Err(IngestError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Logradouro", "Período"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_only_one_of_street_or_period_is_enough() {
        let table = table(&["Data", "Período", "Qtd. pessoas"], &[&["01/01/2024", "20h - Noite", "3"]]);

        let ingested = ingest(&table).unwrap();
        assert!(!ingested.has_street);
        assert!(ingested.has_period);
        assert_eq!(ingested.records[0].street(), "");
    }

    #[test]
    fn test_missing_count_column_is_fatal() {
        let table = table(&["Data", "Logradouro"], &[&["01/01/2024", "Rua Aurora"]]);
        assert!(matches!(
            ingest(&table),
            Err(IngestError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_bad_rows_are_dropped_and_counted() {
        let table = table(
            &["Data", "Logradouro", "Período", "Qtd. pessoas"],
            &[
                &["01/01/2024", "Rua Aurora, 50", "05h - Madrugada", "4"],
                &["ontem", "Rua Aurora, 50", "05h - Madrugada", "4"],
                &["02/01/2024", "Rua Aurora, 50", "05h - Madrugada", "quatro"],
                &["02/01/2024", "Rua Aurora, 50", "05h - Madrugada", ""],
            ],
        );

        let ingested = ingest(&table).unwrap();

        assert_eq!(ingested.records.len(), 1);
        assert_eq!(ingested.stats.total_rows, 4);
        assert_eq!(ingested.stats.kept_rows, 1);
        assert_eq!(ingested.stats.dropped_bad_date, 1);
        assert_eq!(ingested.stats.dropped_bad_count, 2);
        // Quality counters cover every row, kept or not.
        assert_eq!(ingested.stats.with_street, 4);
    }

    #[test]
    fn test_standardize_needs_only_street_or_period() {
        let table = table(
            &["Logradouro", "Período", "Observação"],
            &[&["rua Aurora,50", "Manhã - 10h", "chuva"]],
        );

        let standardized = standardize(&table).unwrap();
        let out = &standardized.table;

        assert_eq!(
            out.headers,
            vec![
                "Logradouro",
                "Período",
                "tipo_logradouro",
                "nome_logradouro",
                "numero_logradouro",
                "complemento_logradouro",
                "Observação",
            ]
        );
        assert_eq!(
            out.rows[0],
            vec!["Rua Aurora, 50", "10h - Manhã", "Rua", "Aurora", "50", "", "chuva"]
        );
        assert_eq!(standardized.stats.total_rows, 1);
        assert_eq!(standardized.stats.with_number, 1);
    }

    #[test]
    fn test_standardize_keeps_rows_with_bad_date_or_count() {
        let table = table(
            &["Observação", "Qtd. pessoas", "Período", "Data", "Equipe"],
            &[
                &["", "quatro", "20h - Noite", "ontem", "B"],
                &["x", "3", "noite - 20h", "01/01/2024"],
            ],
        );

        let standardized = standardize(&table).unwrap();
        let out = &standardized.table;

        assert!(!standardized.has_street);
        assert_eq!(out.headers, vec!["Equipe", "Data", "Período", "Qtd. pessoas", "Observação"]);
        assert_eq!(out.rows[0], vec!["B", "ontem", "20h - Noite", "quatro", ""]);
        assert_eq!(out.rows[1], vec!["", "01/01/2024", "20h - Noite", "3", "x"]);
        assert_eq!(standardized.stats.kept_rows, 2);
        assert_eq!(standardized.stats.dropped_rows(), 0);
    }

    #[test]
    fn test_standardize_without_street_or_period_is_fatal() {
        let table = table(&["Data", "Observação"], &[&["01/01/2024", "x"]]);
        assert!(matches!(
            standardize(&table),
            Err(IngestError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2);
        assert_eq!(parse_date("02/01/2024"), expected);
        assert_eq!(parse_date("2024-01-02"), expected);
        assert_eq!(parse_date("2024-01-02 00:00:00"), expected);
        assert_eq!(parse_date("02/01/2024 20:15"), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("32/01/2024"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12"), Some(12.0));
        assert_eq!(parse_count("2,5"), Some(2.5));
        assert_eq!(parse_count(" 0 "), Some(0.0));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("NaN"), None);
        assert_eq!(parse_count(""), None);
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }
}
