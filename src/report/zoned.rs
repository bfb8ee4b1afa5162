//! Matrix regrouped by zone ("quadra"), with a subtotal after every zone that
//! has more than one visible street.

use serde::Serialize;
use tracing::info;

use crate::parser::Period;
use crate::report::types::{Column, DailyMatrix, PeriodMeans, StreetRow, TotalsRow};
use crate::report::utility::{mean, round_half_even};
use crate::zones::ZoneMapper;

/// Sort key for streets without a zone; keeps them after every named zone.
pub const UNMAPPED_ZONE_KEY: &str = "ZZZ_SEM_QUADRA";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ZonedEntry {
    Street {
        zone: Option<String>,
        row: StreetRow,
    },
    Subtotal {
        zone: String,
        cells: Vec<f64>,
        mean_by_period: PeriodMeans,
    },
}

impl ZonedEntry {
    pub fn is_visible(&self) -> bool {
        match self {
            ZonedEntry::Street { row, .. } => row.visible,
            ZonedEntry::Subtotal { .. } => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZonedMatrix {
    pub columns: Vec<Column>,
    pub entries: Vec<ZonedEntry>,
    pub totals: TotalsRow,
    /// Mean of the grand-total columns, empty cells counted as zero.
    pub average: f64,
}

impl ZonedMatrix {
    pub fn subtotals(&self) -> impl Iterator<Item = &ZonedEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e, ZonedEntry::Subtotal { .. }))
    }
}

/// Regroups `matrix` by zone. Rows keep their matrix order inside a zone and
/// visible rows are renumbered over the new order.
#[tracing::instrument(skip_all, fields(rows = matrix.rows.len(), zones = mapper.len()))]
pub fn group_by_zone(matrix: &DailyMatrix, mapper: &ZoneMapper) -> ZonedMatrix {
    let mut keyed: Vec<(Option<String>, usize)> = matrix
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (mapper.lookup(&row.street).map(str::to_string), idx))
        .collect();

    keyed.sort_by(|(za, ia), (zb, ib)| {
        let ka = za.as_deref().unwrap_or(UNMAPPED_ZONE_KEY);
        let kb = zb.as_deref().unwrap_or(UNMAPPED_ZONE_KEY);
        ka.cmp(kb).then(ia.cmp(ib))
    });

    let mut entries = Vec::with_capacity(keyed.len());
    let mut order = 0;
    let mut subtotals = 0;

    for group in keyed.chunk_by(|(a, _), (b, _)| a == b) {
        let zone = group[0].0.clone();
        let mut visible: Vec<&StreetRow> = Vec::new();

        for (_, idx) in group {
            let mut row = matrix.rows[*idx].clone();
            if row.visible {
                order += 1;
                row.order = Some(order);
                visible.push(&matrix.rows[*idx]);
            } else {
                row.order = None;
            }
            entries.push(ZonedEntry::Street {
                zone: zone.clone(),
                row,
            });
        }

        let Some(zone) = zone else { continue };
        if visible.len() > 1 {
            entries.push(subtotal(zone, &matrix.columns, &visible));
            subtotals += 1;
        }
    }

    info!(entries = entries.len(), subtotals, "Zoned matrix built");

    ZonedMatrix {
        columns: matrix.columns.clone(),
        entries,
        totals: matrix.totals.clone(),
        average: round_half_even(mean(&matrix.totals.cells)),
    }
}

fn subtotal(zone: String, columns: &[Column], rows: &[&StreetRow]) -> ZonedEntry {
    let cells: Vec<f64> = (0..columns.len())
        .map(|i| round_half_even(rows.iter().map(|r| r.cells[i]).sum()))
        .collect();

    // Mean columns add up like every other column.
    let mut mean_by_period = PeriodMeans::default();
    for period in Period::ALL {
        let means: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.mean_by_period.get(period))
            .collect();
        if !means.is_empty() {
            mean_by_period.set(period, Some(round_half_even(means.iter().sum())));
        }
    }

    ZonedEntry::Subtotal {
        zone,
        cells,
        mean_by_period,
    }
}
