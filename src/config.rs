use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables for a report run.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "threshold": 10,
///   "top_n": 5,
///   "comparison": { "weekday_aware": false }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// A cell counts as a crowd when strictly above this value.
    pub threshold: f64,
    /// How many streets the busiest-streets list keeps.
    pub top_n: usize,
    /// Trailing valid days summed for the busiest-streets list.
    pub top_streets_days: usize,
    /// Smallest absolute day-to-day change reported as a delta.
    pub delta_minimum: f64,
    pub comparison: ComparisonConfig,
    /// Region named in the analysis text.
    pub region_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            top_n: 5,
            top_streets_days: 3,
            delta_minimum: 10.0,
            comparison: ComparisonConfig::default(),
            region_label: "Santa Cecília, Campos Elíseos e Santa Ifigênia".to_string(),
        }
    }
}

/// How far back the comparison window is shifted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub default_shift_days: i64,
    /// Used when the window ends on a Monday, to compare against Friday.
    pub monday_shift_days: i64,
    pub weekday_aware: bool,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            default_shift_days: 1,
            monday_shift_days: 3,
            weekday_aware: true,
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading report config '{path}'"))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing report config '{path}'"))?;
        Ok(config)
    }
}
