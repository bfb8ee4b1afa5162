use serde::Serialize;
use std::collections::BTreeMap;

use crate::parser::ParsedAddress;

/// Parsing-quality counters collected while ingesting a table.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct IngestStats {
    pub total_rows: usize,
    pub kept_rows: usize,

    // row drops
    pub dropped_bad_date: usize,
    pub dropped_bad_count: usize,

    // address fields
    pub with_street: usize,
    pub with_type: usize,
    pub with_name: usize,
    pub with_number: usize,
    pub with_complement: usize,

    // period field
    pub with_period: usize,

    pub street_types: BTreeMap<String, usize>,
    pub periods: BTreeMap<String, usize>,
}

impl IngestStats {
    pub fn record_address(&mut self, address: &ParsedAddress) {
        if address.is_empty() {
            return;
        }

        self.with_street += 1;

        if !address.street_type.is_empty() {
            self.with_type += 1;
            *self
                .street_types
                .entry(address.street_type.clone())
                .or_default() += 1;
        }

        if !address.name.is_empty() {
            self.with_name += 1;
        }

        if !address.number.is_empty() {
            self.with_number += 1;
        }

        if !address.complement.is_empty() {
            self.with_complement += 1;
        }
    }

    pub fn record_period(&mut self, period: &str) {
        if period.is_empty() {
            return;
        }

        self.with_period += 1;
        *self.periods.entry(period.to_string()).or_default() += 1;
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn dropped_rows(&self) -> usize {
        self.dropped_bad_date + self.dropped_bad_count
    }

    /// Street types by descending frequency, ties broken alphabetically.
    pub fn top_street_types(&self, n: usize) -> Vec<(&str, usize)> {
        let mut types: Vec<_> = self
            .street_types
            .iter()
            .map(|(t, c)| (t.as_str(), *c))
            .collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        types.truncate(n);
        types
    }
}
