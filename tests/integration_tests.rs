use std::path::Path;

use chrono::NaiveDate;
use street_count::config::ReportConfig;
use street_count::error::IngestError;
use street_count::ingest::{ingest, standardize};
use street_count::output::matrix_csv_bytes;
use street_count::parser::Period;
use street_count::report::analyzer::build_report;
use street_count::report::text::render_analysis;
use street_count::report::window::ReportWindow;
use street_count::report::zoned::ZonedEntry;
use street_count::table::Table;
use street_count::zones::ZoneMapper;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn sample_table() -> Table {
    Table::load(Path::new("tests/fixtures/contagem_sample.csv")).expect("Failed to load fixture")
}

#[test]
fn test_ingest_fixture() {
    let ingested = ingest(&sample_table()).unwrap();

    assert_eq!(ingested.stats.total_rows, 11);
    assert_eq!(ingested.records.len(), 9);
    assert_eq!(ingested.stats.dropped_bad_date, 1);
    assert_eq!(ingested.stats.dropped_bad_count, 1);

    let streets: Vec<&str> = ingested.records.iter().map(|r| r.street()).collect();
    assert!(streets.contains(&"Avenida Duque de Caxias, 784"));
    assert!(streets.contains(&"Alameda Barão de Limeira, 300 - Bloco B"));

    let periods: Vec<&str> = ingested.records.iter().map(|r| r.period.as_str()).collect();
    assert!(periods.contains(&"05h - Madrugada"));
    assert!(!periods.contains(&"Manhã - 10h"));
}

#[test]
fn test_full_report_pipeline() {
    let ingested = ingest(&sample_table()).unwrap();
    let window = ReportWindow::new(day(7), day(8)).unwrap();

    let report = build_report(&ingested.records, window, &ReportConfig::default(), None).unwrap();
    let matrix = &report.matrix;

    let rows: Vec<(&str, Option<usize>)> = matrix
        .rows
        .iter()
        .map(|r| (r.street.as_str(), r.order))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Alameda Barão de Limeira, 300 - Bloco B", Some(1)),
            ("Avenida Duque de Caxias, 784", None),
            ("Rua Aurora, 50", Some(2)),
            ("Rua Vitória, 10", Some(3)),
        ]
    );

    // Duplicate rows for the same street, period and day add up.
    let aurora = &matrix.rows[2];
    assert_eq!(&aurora.cells[matrix.period_span(Period::Madrugada)], &[15.0]);
    assert_eq!(aurora.count_above_threshold, 3);
    assert_eq!(aurora.mean_by_period.noite, Some(13.0));

    assert_eq!(matrix.totals.cells, vec![40.0, 22.0, 11.0, 13.0]);

    let summary = &report.summary;
    assert_eq!(summary.comparison_reference, "sexta-feira");
    assert_eq!(summary.previous_window, ReportWindow::new(day(4), day(5)).unwrap());
    assert_eq!(summary.current_average, 22.0);
    assert_eq!(summary.previous_average, 12.0);
    assert_eq!(summary.percent_change, 83.3);
    assert_eq!(summary.top_streets[0].street, "Rua Aurora, 50");
    assert_eq!(summary.top_streets[0].total, 35.0);

    let dawn = summary.snapshot(Period::Madrugada).unwrap();
    assert_eq!(dawn.total, 40.0);
    assert_eq!(dawn.crowded_sites, 2);

    let csv = String::from_utf8(matrix_csv_bytes(matrix).unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 1 + 4 + 1);

    let generated = day(9).and_hms_opt(8, 0, 0).unwrap();
    let text = render_analysis(summary, &ReportConfig::default(), generated);
    assert!(text.contains("em 08/01/2024 foram localizadas 40 pessoas de madrugada (05h)"));
    assert!(text.contains("13 à noite (20h) do dia 07."));
    assert!(text.contains("um aumento de 83.3% em relação à contagem enviada sexta-feira."));
}

#[test]
fn test_zoned_report_from_mapping_file() {
    let ingested = ingest(&sample_table()).unwrap();
    let mapper = ZoneMapper::load(Path::new("tests/fixtures/quadras.csv")).unwrap();
    let window = ReportWindow::new(day(7), day(8)).unwrap();

    let report = build_report(&ingested.records, window, &ReportConfig::default(), Some(&mapper)).unwrap();
    let zoned = report.zoned.expect("zoned matrix");

    let layout: Vec<String> = zoned
        .entries
        .iter()
        .map(|e| match e {
            ZonedEntry::Street { row, .. } => row.street.clone(),
            ZonedEntry::Subtotal { zone, .. } => format!("Subtotal {zone}"),
        })
        .collect();
    assert_eq!(
        layout,
        vec![
            "Rua Aurora, 50",
            "Rua Vitória, 10",
            "Subtotal Q1",
            "Alameda Barão de Limeira, 300 - Bloco B",
            "Avenida Duque de Caxias, 784",
        ]
    );

    let ZonedEntry::Subtotal { cells, .. } = &zoned.entries[2] else {
        panic!("expected a subtotal");
    };
    assert_eq!(cells, &vec![15.0, 20.0, 11.0, 13.0]);

    // Mean of the grand totals [40, 22, 11, 13].
    assert_eq!(zoned.average, 22.0);
}

#[test]
fn test_xlsx_fixture_loads_dates_and_counts() {
    let path = Path::new("tests/fixtures/contagem_sample.xlsx");
    let table = Table::load(path).expect("Failed to load spreadsheet fixture");

    assert_eq!(
        table.headers,
        vec!["Equipe", "Data", "Logradouro", "Período", "Qtd. pessoas", "Observação"]
    );
    assert_eq!(table.len(), 3);
    assert_eq!(table.cell(0, 1), "2024-01-08 00:00:00");
    assert_eq!(table.cell(0, 4), "12");
    assert_eq!(table.cell(2, 4), "2.5");
    assert_eq!(table.cell(1, 5), "");

    let bytes = std::fs::read(path).unwrap();
    assert_eq!(Table::from_bytes(bytes, "contagem.xlsx").unwrap(), table);

    let ingested = ingest(&table).unwrap();
    assert_eq!(ingested.records.len(), 3);

    let first = &ingested.records[0];
    assert_eq!(first.date, day(8));
    assert_eq!(first.street(), "Rua Aurora, 50");
    assert_eq!(first.period, "10h - Manhã");
    assert_eq!(first.count, 12.0);
    assert_eq!(ingested.records[1].date, day(7));
    assert_eq!(ingested.records[2].count, 2.5);

    let standardized = standardize(&table).unwrap();
    let out = &standardized.table;
    assert_eq!(out.headers[5], "tipo_logradouro");
    assert_eq!(out.headers[9], "Observação");
    assert_eq!(out.cell(0, 9), "chuva");
    assert_eq!(out.cell(0, 1), "2024-01-08 00:00:00");
}

#[test]
fn test_standardize_keeps_tables_without_date_or_count() {
    let table = Table::new(
        vec!["Logradouro".into(), "Período".into(), "Observação".into()],
        vec![vec!["Rua Aurora,50".into(), "Tarde - 15h".into(), "fila".into()]],
    );

    let standardized = standardize(&table).unwrap();

    assert_eq!(standardized.table.len(), 1);
    assert_eq!(standardized.table.cell(0, 0), "Rua Aurora, 50");
    assert_eq!(standardized.table.cell(0, 1), "15h - Tarde");
    assert_eq!(standardized.table.cell(0, 6), "fila");
    assert!(matches!(ingest(&table), Err(IngestError::MissingColumns { .. })));
}

#[test]
fn test_missing_columns_abort() {
    let table = Table::new(
        vec!["Equipe".into(), "Data".into(), "Qtd. pessoas".into()],
        vec![vec!["Equipe 1".into(), "01/01/2024".into(), "3".into()]],
    );

    match ingest(&table) {
        Err(IngestError::MissingColumns { missing }) => {
            assert_eq!(missing, vec!["Logradouro", "Período"]);
        }
        other => panic!("expected missing columns, got {other:?}"),
    }
}
