//! Data types produced by the report pipeline and handed to the renderers.

use chrono::NaiveDate;
use serde::Serialize;

use crate::parser::Period;
use crate::report::window::ReportWindow;

/// One matrix column: a period on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub period: Period,
    pub day: NaiveDate,
}

/// A rounded mean per period; `None` when the period had no positive cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodMeans {
    pub madrugada: Option<f64>,
    pub manha: Option<f64>,
    pub tarde: Option<f64>,
    pub noite: Option<f64>,
}

impl PeriodMeans {
    pub fn get(&self, period: Period) -> Option<f64> {
        match period {
            Period::Madrugada => self.madrugada,
            Period::Manha => self.manha,
            Period::Tarde => self.tarde,
            Period::Noite => self.noite,
        }
    }

    pub fn set(&mut self, period: Period, value: Option<f64>) {
        let slot = match period {
            Period::Madrugada => &mut self.madrugada,
            Period::Manha => &mut self.manha,
            Period::Tarde => &mut self.tarde,
            Period::Noite => &mut self.noite,
        };
        *slot = value;
    }
}

/// One street of the daily matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetRow {
    /// 1-based position among visible rows; `None` for hidden rows.
    pub order: Option<usize>,
    pub street: String,
    /// One value per [`Column`], 0 where nothing was counted.
    pub cells: Vec<f64>,
    pub mean_by_period: PeriodMeans,
    pub count_above_threshold: usize,
    /// At least one cell is strictly above the threshold. Hidden rows stay in
    /// the matrix; renderers collapse them.
    pub visible: bool,
}

impl StreetRow {
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }
}

/// Column sums over every street row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalsRow {
    pub cells: Vec<f64>,
    pub mean_by_period: PeriodMeans,
}

/// The street × (period, day) matrix for one report window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMatrix {
    pub window: ReportWindow,
    pub threshold: f64,
    pub columns: Vec<Column>,
    pub rows: Vec<StreetRow>,
    pub totals: TotalsRow,
}

impl DailyMatrix {
    pub fn visibility_flags(&self) -> Vec<bool> {
        self.rows.iter().map(|r| r.visible).collect()
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &StreetRow> {
        self.rows.iter().filter(|r| r.visible)
    }

    /// Indices of the columns belonging to `period`.
    pub fn period_span(&self, period: Period) -> std::ops::Range<usize> {
        let start = self.columns.iter().position(|c| c.period == period);
        match start {
            Some(start) => {
                let len = self.columns[start..]
                    .iter()
                    .take_while(|c| c.period == period)
                    .count();
                start..start + len
            }
            None => 0..0,
        }
    }
}

/// A street and its people total over the trailing days of the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopStreet {
    pub street: String,
    pub total: f64,
}

/// A change between two consecutive days of one street and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetDelta {
    pub street: String,
    pub period: Period,
    pub from_day: NaiveDate,
    pub to_day: NaiveDate,
    pub from_value: f64,
    pub to_value: f64,
    pub delta: f64,
    /// Relative to `from_value`; 100 when `from_value` was 0.
    pub percent: f64,
}

/// Totals for one period on the last day of the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSnapshot {
    pub period: Period,
    pub day: NaiveDate,
    pub total: f64,
    /// Streets strictly above the threshold.
    pub crowded_sites: usize,
    /// People counted at those streets.
    pub crowded_total: f64,
}

/// Headline statistics for the analysis text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub current_window: ReportWindow,
    pub previous_window: ReportWindow,
    /// `"ontem"` or `"sexta-feira"`.
    pub comparison_reference: String,
    pub current_average: f64,
    pub previous_average: f64,
    pub percent_change: f64,
    pub top_streets: Vec<TopStreet>,
    /// Increases (largest first) followed by decreases (most negative first).
    pub deltas: Vec<StreetDelta>,
    pub last_day: Vec<PeriodSnapshot>,
}

impl ReportSummary {
    pub fn largest_increases(&self) -> impl Iterator<Item = &StreetDelta> {
        self.deltas.iter().filter(|d| d.delta > 0.0)
    }

    pub fn largest_decreases(&self) -> impl Iterator<Item = &StreetDelta> {
        self.deltas.iter().filter(|d| d.delta < 0.0)
    }

    pub fn snapshot(&self, period: Period) -> Option<&PeriodSnapshot> {
        self.last_day.iter().find(|s| s.period == period)
    }
}
