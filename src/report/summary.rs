use chrono::NaiveDate;
use tracing::info;

use crate::config::ReportConfig;
use crate::parser::Period;
use crate::report::aggregate::CountCells;
use crate::report::types::{PeriodSnapshot, ReportSummary, StreetDelta, TopStreet};
use crate::report::utility::{mean_of_positive, round_half_even, round_to};
use crate::report::window::ReportWindow;

/// Headline statistics for `window`, compared against `previous_window`.
#[tracing::instrument(skip(current, previous, config))]
pub fn summarize(
    current: &CountCells,
    previous: &CountCells,
    window: &ReportWindow,
    previous_window: &ReportWindow,
    config: &ReportConfig,
) -> ReportSummary {
    let current_average = window_average(current, window);
    let previous_average = window_average(previous, previous_window);
    let percent_change = percent_change(current_average, previous_average);

    let comparison_reference = if config.comparison.weekday_aware && window.ends_on_monday() {
        "sexta-feira"
    } else {
        "ontem"
    };

    info!(
        current_average,
        previous_average, percent_change, "Window averages computed"
    );

    ReportSummary {
        current_window: *window,
        previous_window: *previous_window,
        comparison_reference: comparison_reference.to_string(),
        current_average,
        previous_average,
        percent_change,
        top_streets: top_streets(current, window, config.top_streets_days, config.top_n),
        deltas: detect_deltas(current, window, config.delta_minimum),
        last_day: period_snapshots(current, window, config.threshold),
    }
}

/// Rounded mean of the non-zero column sums over the whole window; 0 when
/// nothing was counted.
pub fn window_average(cells: &CountCells, window: &ReportWindow) -> f64 {
    mean_of_positive(cells.column_sums(&window.columns()))
        .map(round_half_even)
        .unwrap_or(0.0)
}

/// Relative change in percent, one decimal. 0 when `previous` is 0.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round_to((current - previous) / previous * 100.0, 1)
}

/// Streets with the largest totals over the last `days` valid days, all
/// periods included. Ties keep street order.
pub fn top_streets(cells: &CountCells, window: &ReportWindow, days: usize, n: usize) -> Vec<TopStreet> {
    let valid = window.valid_days();
    let trailing = &valid[valid.len().saturating_sub(days)..];

    let mut totals: Vec<TopStreet> = cells
        .streets()
        .iter()
        .map(|address| TopStreet {
            street: address.canonical.clone(),
            total: Period::ALL
                .iter()
                .flat_map(|&p| trailing.iter().map(move |&d| (p, d)))
                .map(|(p, d)| cells.get(&address.canonical, p, d))
                .sum(),
        })
        .filter(|t| t.total > 0.0)
        .collect();

    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals.truncate(n);
    totals
}

/// Day-to-day changes of at least `minimum` people, per street and period.
/// Increases come first, largest first, then decreases, most negative first.
pub fn detect_deltas(cells: &CountCells, window: &ReportWindow, minimum: f64) -> Vec<StreetDelta> {
    let mut increases = Vec::new();
    let mut decreases = Vec::new();

    for address in cells.streets() {
        let street = &address.canonical;
        for period in Period::ALL {
            for pair in window.days_for(period).windows(2) {
                let (from_day, to_day) = (pair[0], pair[1]);
                let from_value = cells.get(street, period, from_day);
                let to_value = cells.get(street, period, to_day);
                let delta = to_value - from_value;

                if delta.abs() < minimum || delta == 0.0 {
                    continue;
                }

                let percent = if from_value == 0.0 {
                    100.0
                } else {
                    round_to(delta / from_value * 100.0, 1)
                };

                let entry = StreetDelta {
                    street: street.clone(),
                    period,
                    from_day,
                    to_day,
                    from_value,
                    to_value,
                    delta,
                    percent,
                };
                if delta > 0.0 {
                    increases.push(entry);
                } else {
                    decreases.push(entry);
                }
            }
        }
    }

    increases.sort_by(|a, b| b.delta.total_cmp(&a.delta));
    decreases.sort_by(|a, b| a.delta.total_cmp(&b.delta));
    increases.extend(decreases);
    increases
}

/// Per-period totals on the last day of the window. Night reads the last
/// night day.
pub fn period_snapshots(cells: &CountCells, window: &ReportWindow, threshold: f64) -> Vec<PeriodSnapshot> {
    Period::ALL
        .iter()
        .map(|&period| {
            let day = match period {
                Period::Noite => window.last_night_day(),
                _ => window.last_valid_day(),
            };
            snapshot(cells, period, day, threshold)
        })
        .collect()
}

fn snapshot(cells: &CountCells, period: Period, day: NaiveDate, threshold: f64) -> PeriodSnapshot {
    let mut out = PeriodSnapshot {
        period,
        day,
        total: 0.0,
        crowded_sites: 0,
        crowded_total: 0.0,
    };
    for address in cells.streets() {
        let value = cells.get(&address.canonical, period, day);
        out.total += value;
        if value > threshold {
            out.crowded_sites += 1;
            out.crowded_total += value;
        }
    }
    out
}
