//! Street → zone ("região" / "quadra") lookup.
//!
//! Three mapping shapes are supported, chosen by the columns of the mapping
//! table:
//!
//! | Columns                               | Lookup                                   |
//! |---------------------------------------|------------------------------------------|
//! | original, zone                        | street → zone                            |
//! | original, official, zone              | street → official name → zone            |
//! | original, num min, num max, zone      | street name + house number within range  |
//!
//! Names are compared trimmed and lower-cased. Streets that do not resolve
//! fall into the [`DEFAULT_ZONE`] bucket.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::IngestError;
use crate::table::Table;

/// Bucket for streets with no mapping entry.
pub const DEFAULT_ZONE: &str = "Outros";

const ORIGINAL_COLUMNS: &[&str] = &["Nome Original", "Original", "Padrão", "Logradouro"];
const OFFICIAL_COLUMNS: &[&str] = &["Oficial", "Nome Oficial"];
const ZONE_COLUMNS: &[&str] = &["Quadra", "Região", "Zona"];
const MIN_COLUMNS: &[&str] = &["Num Min", "Número Mínimo", "Numero Min"];
const MAX_COLUMNS: &[&str] = &["Num Max", "Número Máximo", "Numero Max"];

static NAME_AND_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?),\s*(\d+)").unwrap_or_else(|_| unreachable!()));

/// A block of one street name, `[min, max]` inclusive. Bounds that failed to
/// parse are `None` and the entry never matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRange {
    pub name: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub zone: String,
}

impl ZoneRange {
    fn contains(&self, number: i64) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= number && number <= max,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Mapping {
    Direct {
        zones: HashMap<String, String>,
    },
    Unified {
        official: HashMap<String, String>,
        zones: HashMap<String, String>,
    },
    Ranged {
        ranges: Vec<ZoneRange>,
    },
}

/// Read-only street → zone lookup, loaded once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneMapper {
    mapping: Mapping,
}

impl ZoneMapper {
    /// Two-column mapping: original name → zone.
    pub fn direct<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let zones = entries
            .into_iter()
            .map(|(name, zone)| (normalize_name(name.as_ref()), zone.into()))
            .collect();
        Self {
            mapping: Mapping::Direct { zones },
        }
    }

    /// Three-column mapping: original name → official name → zone.
    pub fn unified<I, A, B, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, B, C)>,
        A: AsRef<str>,
        B: AsRef<str>,
        C: Into<String>,
    {
        let mut official = HashMap::new();
        let mut zones = HashMap::new();
        for (original, official_name, zone) in entries {
            let official_name = official_name.as_ref().trim().to_string();
            official.insert(normalize_name(original.as_ref()), official_name.clone());
            zones.insert(normalize_name(&official_name), zone.into());
        }
        Self {
            mapping: Mapping::Unified { official, zones },
        }
    }

    /// Street-number range mapping.
    pub fn ranged(ranges: Vec<ZoneRange>) -> Self {
        let ranges = ranges
            .into_iter()
            .map(|r| ZoneRange {
                name: normalize_name(&r.name),
                ..r
            })
            .collect();
        Self {
            mapping: Mapping::Ranged { ranges },
        }
    }

    /// Builds a mapper from a mapping table. Columns are found by header;
    /// without recognizable headers a 2-column table is read as
    /// `original, zone` and a 3-column table as `original, official, zone`.
    pub fn from_table(table: &Table) -> Result<Self, IngestError> {
        let original = table.column(ORIGINAL_COLUMNS);
        let zone = table.column(ZONE_COLUMNS);
        let official = table.column(OFFICIAL_COLUMNS);
        let min = table.column(MIN_COLUMNS);
        let max = table.column(MAX_COLUMNS);

        let (original, zone) = match (original, zone) {
            (Some(original), Some(zone)) => (original, zone),
            _ => match table.headers.len() {
                2 => (0, 1),
                n if n >= 3 => (0, 2),
                _ => {
                    return Err(IngestError::MissingColumns {
                        missing: vec!["Nome Original".to_string(), "Quadra".to_string()],
                    });
                }
            },
        };
        let official = official.or_else(|| {
            (table.column(ORIGINAL_COLUMNS).is_none() && table.headers.len() >= 3).then_some(1)
        });

        let rows = 0..table.len();
        let mapper = match (min, max, official) {
            (Some(min), Some(max), _) => Self::ranged(
                rows.map(|r| ZoneRange {
                    name: table.cell(r, original).to_string(),
                    min: parse_bound(table.cell(r, min)),
                    max: parse_bound(table.cell(r, max)),
                    zone: table.cell(r, zone).to_string(),
                })
                .collect(),
            ),
            (_, _, Some(official)) => Self::unified(rows.map(|r| {
                (
                    table.cell(r, original),
                    table.cell(r, official),
                    table.cell(r, zone).to_string(),
                )
            })),
            _ => Self::direct(
                rows.map(|r| (table.cell(r, original), table.cell(r, zone).to_string())),
            ),
        };

        info!(entries = mapper.len(), kind = mapper.kind(), "Zone mapping loaded");
        Ok(mapper)
    }

    /// Loads a mapping table from a CSV or spreadsheet file.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        Self::from_table(&Table::load(path)?)
    }

    /// Zone for `street`, or `None` when the mapping has no entry for it.
    pub fn lookup(&self, street: &str) -> Option<&str> {
        let zone = match &self.mapping {
            Mapping::Direct { zones } => zones.get(&normalize_name(street)),
            Mapping::Unified { official, zones } => {
                let key = normalize_name(street);
                let name = official.get(&key).map(|o| normalize_name(o)).unwrap_or(key);
                zones.get(&name)
            }
            Mapping::Ranged { ranges } => {
                let (name, number) = split_name_number(street);
                ranges
                    .iter()
                    .filter(|r| r.name == name)
                    .find(|r| r.contains(number))
                    .map(|r| &r.zone)
            }
        };

        let zone = zone.map(String::as_str).filter(|z| !z.trim().is_empty());
        if zone.is_none() {
            debug!(street, "Street has no zone mapping");
        }
        zone
    }

    /// Zone for `street`, falling back to [`DEFAULT_ZONE`].
    pub fn resolve(&self, street: &str) -> String {
        self.lookup(street).unwrap_or(DEFAULT_ZONE).to_string()
    }

    /// Official unified name for `street` (three-column mappings only).
    pub fn official_name(&self, street: &str) -> Option<&str> {
        match &self.mapping {
            Mapping::Unified { official, .. } => {
                official.get(&normalize_name(street)).map(String::as_str)
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.mapping {
            Mapping::Direct { zones } => zones.len(),
            Mapping::Unified { official, .. } => official.len(),
            Mapping::Ranged { ranges } => ranges.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match &self.mapping {
            Mapping::Direct { .. } => "direct",
            Mapping::Unified { .. } => "unified",
            Mapping::Ranged { .. } => "ranged",
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Splits `"Rua X, 120 - fundos"` into `("rua x", 120)`; no number gives 0.
fn split_name_number(street: &str) -> (String, i64) {
    let street = street.trim();
    match NAME_AND_NUMBER.captures(street) {
        Some(caps) => {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or(street);
            let number = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            (normalize_name(name), number)
        }
        None => (normalize_name(street), 0),
    }
}

fn parse_bound(raw: &str) -> Option<i64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v as i64)
}
