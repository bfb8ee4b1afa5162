use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::ingest::CountRecord;
use crate::parser::{ParsedAddress, Period};
use crate::report::types::{Column, DailyMatrix, PeriodMeans, StreetRow, TotalsRow};
use crate::report::utility::{mean_of_positive, round_half_even};
use crate::report::window::ReportWindow;

/// Summed people counts keyed by street, period and day, restricted to one
/// report window. Rows sharing a key accumulate.
#[derive(Debug, Clone, Default)]
pub struct CountCells {
    cells: HashMap<String, HashMap<(Period, NaiveDate), f64>>,
    streets: Vec<ParsedAddress>,
    /// Records inside the window whose period is not one of the four.
    pub skipped_period: usize,
    /// Records inside the window with no street.
    pub skipped_street: usize,
}

impl CountCells {
    pub fn from_records(records: &[CountRecord], window: &ReportWindow) -> Self {
        let mut out = CountCells::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut first_seen: Vec<&ParsedAddress> = Vec::new();

        for record in records.iter().filter(|r| window.contains(r.date)) {
            if record.street().is_empty() {
                out.skipped_street += 1;
                continue;
            }

            let Some(period) = record.period_key() else {
                debug!(period = %record.period, "Skipping record with unknown period");
                out.skipped_period += 1;
                continue;
            };

            *out.cells
                .entry(record.street().to_string())
                .or_default()
                .entry((period, record.date))
                .or_default() += record.count;

            if seen.insert(record.street()) {
                first_seen.push(&record.address);
            }
        }

        if out.skipped_period > 0 || out.skipped_street > 0 {
            warn!(
                skipped_period = out.skipped_period,
                skipped_street = out.skipped_street,
                "Records excluded from aggregation"
            );
        }

        // Stable sort: streets equal up to case keep their input order.
        out.streets = first_seen.into_iter().cloned().collect();
        out.streets.sort_by(street_order);
        out
    }

    /// Summed count for a key; 0 when nothing was recorded.
    pub fn get(&self, street: &str, period: Period, day: NaiveDate) -> f64 {
        self.cells
            .get(street)
            .and_then(|by_key| by_key.get(&(period, day)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Distinct streets in report order.
    pub fn streets(&self) -> &[ParsedAddress] {
        &self.streets
    }

    /// Sum over every street for each column.
    pub fn column_sums(&self, columns: &[Column]) -> Vec<f64> {
        columns
            .iter()
            .map(|c| {
                self.streets
                    .iter()
                    .map(|s| self.get(&s.canonical, c.period, c.day))
                    .sum()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.streets.is_empty()
    }
}

/// Street type, then name, then house number (missing last), then the full
/// string; case-insensitive throughout.
fn street_order(a: &ParsedAddress, b: &ParsedAddress) -> Ordering {
    let number = |p: &ParsedAddress| p.house_number().unwrap_or(u64::MAX);
    a.street_type
        .to_lowercase()
        .cmp(&b.street_type.to_lowercase())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| number(a).cmp(&number(b)))
        .then_with(|| a.canonical.to_lowercase().cmp(&b.canonical.to_lowercase()))
}

/// Builds the daily matrix for `records` over `window`.
pub fn aggregate(records: &[CountRecord], window: &ReportWindow, threshold: f64) -> DailyMatrix {
    let cells = CountCells::from_records(records, window);
    build_matrix(&cells, window, threshold)
}

/// Builds one row per street, drops rows that never counted anybody, numbers
/// the visible rows and computes the totals row.
#[tracing::instrument(skip(cells), fields(streets = cells.streets().len()))]
pub fn build_matrix(cells: &CountCells, window: &ReportWindow, threshold: f64) -> DailyMatrix {
    let columns = window.columns();
    let mut rows = Vec::new();

    for address in cells.streets() {
        let street = &address.canonical;
        let values: Vec<f64> = columns
            .iter()
            .map(|c| cells.get(street, c.period, c.day))
            .collect();

        let total: f64 = values.iter().sum();
        if total <= 0.0 {
            continue;
        }

        let count_above_threshold = values.iter().filter(|v| **v > threshold).count();

        rows.push(StreetRow {
            order: None,
            street: street.clone(),
            mean_by_period: period_means(&columns, &values),
            cells: values,
            count_above_threshold,
            visible: count_above_threshold > 0,
        });
    }

    let mut order = 0;
    for row in rows.iter_mut().filter(|r| r.visible) {
        order += 1;
        row.order = Some(order);
    }

    let totals = totals_row(&columns, &rows);

    info!(
        rows = rows.len(),
        visible = order,
        columns = columns.len(),
        "Matrix built"
    );

    DailyMatrix {
        window: *window,
        threshold,
        columns,
        rows,
        totals,
    }
}

/// Rounded mean of the positive cells of each period.
pub(crate) fn period_means(columns: &[Column], values: &[f64]) -> PeriodMeans {
    let mut means = PeriodMeans::default();
    for period in Period::ALL {
        let period_values = columns
            .iter()
            .zip(values)
            .filter(|(c, _)| c.period == period)
            .map(|(_, v)| *v);
        means.set(period, mean_of_positive(period_values).map(round_half_even));
    }
    means
}

fn totals_row(columns: &[Column], rows: &[StreetRow]) -> TotalsRow {
    let cells: Vec<f64> = (0..columns.len())
        .map(|i| rows.iter().map(|r| r.cells[i]).sum())
        .collect();

    TotalsRow {
        mean_by_period: period_means(columns, &cells),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_address;

    #[test]
    fn test_duplicate_keys_accumulate() {
        let records = vec![
            record("Rua Aurora, 50", "05h - Madrugada", 1, 12.0),
            record("Rua Aurora, 50", "05h - Madrugada", 1, 3.0),
        ];
        let window = window(1, 2);

        let cells = CountCells::from_records(&records, &window);
        assert_eq!(cells.get("Rua Aurora, 50", Period::Madrugada, day(1)), 15.0);
        assert_eq!(cells.get("Rua Aurora, 50", Period::Madrugada, day(2)), 0.0);
    }

    #[test]
    fn test_records_outside_window_or_unclassified_are_ignored() {
        let records = vec![
            record("Rua Aurora, 50", "05h - Madrugada", 9, 40.0),
            record("Rua Aurora, 50", "plantão", 2, 40.0),
            record("", "10h - Manhã", 2, 40.0),
        ];

        let cells = CountCells::from_records(&records, &window(1, 3));
        assert!(cells.is_empty());
        assert_eq!(cells.skipped_period, 1);
        assert_eq!(cells.skipped_street, 1);
    }

    #[test]
    fn test_street_ordering() {
        let records = vec![
            record("Rua Vitória, 10", "10h - Manhã", 2, 1.0),
            record("Rua Aurora", "10h - Manhã", 2, 1.0),
            record("Rua Aurora, 200", "10h - Manhã", 2, 1.0),
            record("Rua aurora, 30", "10h - Manhã", 2, 1.0),
            record("Avenida Ipiranga, 5", "10h - Manhã", 2, 1.0),
        ];

        let cells = CountCells::from_records(&records, &window(1, 2));
        let order: Vec<_> = cells.streets().iter().map(|s| s.canonical.as_str()).collect();

        assert_eq!(
            order,
            vec![
                "Avenida Ipiranga, 5",
                "Rua aurora, 30",
                "Rua Aurora, 200",
                "Rua Aurora",
                "Rua Vitória, 10",
            ]
        );
    }

    #[test]
    fn test_case_variant_streets_keep_input_order() {
        let variants = ["Rua aurora, 30", "Rua Aurora, 30", "Rua AURORA, 30"];
        let records: Vec<_> = variants
            .iter()
            .map(|s| record(s, "10h - Manhã", 2, 1.0))
            .collect();

        for _ in 0..50 {
            let cells = CountCells::from_records(&records, &window(1, 2));
            let order: Vec<_> = cells.streets().iter().map(|s| s.canonical.as_str()).collect();
            assert_eq!(order, variants);
        }

        let reversed: Vec<_> = records.iter().rev().cloned().collect();
        let cells = CountCells::from_records(&reversed, &window(1, 2));
        let order: Vec<_> = cells.streets().iter().map(|s| s.canonical.as_str()).collect();
        assert_eq!(order, vec!["Rua AURORA, 30", "Rua Aurora, 30", "Rua aurora, 30"]);

        let matrix = build_matrix(&cells, &window(1, 2), 0.0);
        let orders: Vec<_> = matrix.rows.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_visibility_and_threshold_boundary() {
        let records = vec![
            record("Rua Aurora, 50", "05h - Madrugada", 2, 10.0),
            record("Rua Vitória, 10", "10h - Manhã", 2, 11.0),
        ];

        let matrix = aggregate(&records, &window(1, 2), 10.0);

        let aurora = &matrix.rows[0];
        assert_eq!(aurora.street, "Rua Aurora, 50");
        assert_eq!(aurora.count_above_threshold, 0);
        assert!(!aurora.visible);
        assert_eq!(aurora.order, None);

        let vitoria = &matrix.rows[1];
        assert_eq!(vitoria.count_above_threshold, 1);
        assert!(vitoria.visible);
        assert_eq!(vitoria.order, Some(1));

        assert_eq!(matrix.visibility_flags(), vec![false, true]);
    }

    #[test]
    fn test_visible_rows_are_numbered_contiguously() {
        let records = vec![
            record("Rua A, 1", "05h - Madrugada", 2, 20.0),
            record("Rua B, 1", "05h - Madrugada", 2, 2.0),
            record("Rua C, 1", "05h - Madrugada", 2, 30.0),
            record("Rua D, 1", "05h - Madrugada", 2, 1.0),
            record("Rua E, 1", "05h - Madrugada", 2, 11.0),
        ];

        let matrix = aggregate(&records, &window(1, 2), 10.0);
        let orders: Vec<_> = matrix.rows.iter().map(|r| r.order).collect();

        assert_eq!(orders, vec![Some(1), None, Some(2), None, Some(3)]);
        for row in &matrix.rows {
            assert_eq!(row.visible, row.cells.iter().any(|c| *c > matrix.threshold));
        }
    }

    #[test]
    fn test_rows_without_counts_in_columns_are_dropped() {
        // Dawn of the first day is not a matrix column.
        let records = vec![
            record("Rua Aurora, 50", "05h - Madrugada", 1, 30.0),
            record("Rua Vitória, 10", "05h - Madrugada", 2, 0.0),
        ];

        let matrix = aggregate(&records, &window(1, 2), 10.0);
        assert!(matrix.rows.is_empty());
    }

    #[test]
    fn test_night_uses_shifted_days() {
        let records = vec![
            record("Rua Aurora, 50", "20h - Noite", 1, 14.0),
            record("Rua Aurora, 50", "20h - Noite", 3, 99.0),
        ];

        let matrix = aggregate(&records, &window(1, 3), 10.0);
        let row = &matrix.rows[0];
        let night = matrix.period_span(Period::Noite);

        assert_eq!(&row.cells[night], &[14.0, 0.0]);
        assert_eq!(row.total(), 14.0);
    }

    #[test]
    fn test_period_means_use_positive_cells_only() {
        let records = vec![
            record("Rua Aurora, 50", "10h - Manhã", 2, 12.0),
            record("Rua Aurora, 50", "10h - Manhã", 4, 15.0),
        ];

        let matrix = aggregate(&records, &window(1, 4), 10.0);
        let means = matrix.rows[0].mean_by_period;

        // (12 + 15) / 2 = 13.5, rounded half to even.
        assert_eq!(means.manha, Some(14.0));
        assert_eq!(means.madrugada, None);
        assert_eq!(means.noite, None);
        assert_eq!(matrix.totals.mean_by_period.madrugada, None);
    }

    #[test]
    fn test_totals_row() {
        let records = vec![
            record("Rua Aurora, 50", "10h - Manhã", 2, 12.0),
            record("Rua Vitória, 10", "10h - Manhã", 2, 3.0),
            record("Rua Vitória, 10", "10h - Manhã", 3, 5.0),
        ];

        let matrix = aggregate(&records, &window(1, 3), 10.0);
        let manha = matrix.period_span(Period::Manha);

        assert_eq!(&matrix.totals.cells[manha], &[15.0, 5.0]);
        assert_eq!(matrix.totals.mean_by_period.manha, Some(10.0));
    }

    #[test]
    fn test_end_to_end_duplicate_rows() {
        let table = crate::table::Table::new(
            vec!["Logradouro".into(), "Período".into(), "Data".into(), "Qtd. pessoas".into()],
            vec![
                vec!["Rua Aurora, 50".into(), "05h - Madrugada".into(), "01/01/2024".into(), "12".into()],
                vec!["Rua Aurora, 50".into(), "05h - Madrugada".into(), "01/01/2024".into(), "3".into()],
            ],
        );
        let ingested = crate::ingest::ingest(&table).unwrap();
        let window = window(1, 2);

        let cells = CountCells::from_records(&ingested.records, &window);
        assert_eq!(cells.get("Rua Aurora, 50", Period::Madrugada, day(1)), 15.0);

        // Dawn columns start on the second day, so the first-day pair has no
        // column and the street drops out; a window starting a day earlier
        // shows it.
        assert!(aggregate(&ingested.records, &window, 10.0).rows.is_empty());

        let shifted = ReportWindow::new(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(), day(1)).unwrap();
        let matrix = aggregate(&ingested.records, &shifted, 10.0);
        let row = &matrix.rows[0];
        assert!(row.visible);
        assert_eq!(row.count_above_threshold, 1);
        assert_eq!(row.total(), 15.0);
    }

    fn record(street: &str, period: &str, d: u32, count: f64) -> CountRecord {
        CountRecord {
            team: None,
            date: day(d),
            address: parse_address(street),
            period: period.to_string(),
            count,
        }
    }

    fn window(start: u32, end: u32) -> ReportWindow {
        ReportWindow::new(day(start), day(end)).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }
}
