//! Time-of-day period labels.
//!
//! Field teams write the count period in several ways (`"05h - Madrugada"`,
//! `"Madrugada - 05h"`, `"5h-madrugada"`). [`normalize_period`] rewrites them
//! to the canonical `"HHh - Name"` label; [`Period`] is the closed set of
//! periods the report is keyed on.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::parser::address::title_case;

const DIRECT: &[&str] = &["05h - Madrugada", "10h - Manhã", "15h - Tarde", "20h - Noite"];

const INVERTED: &[(&str, &str)] = &[
    ("Madrugada - 05h", "05h - Madrugada"),
    ("Manhã - 10h", "10h - Manhã"),
    ("Tarde - 15h", "15h - Tarde"),
    ("Noite - 20h", "20h - Noite"),
];

static HOUR_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})h\s*-\s*(\w+)").unwrap_or_else(|_| unreachable!()));

static NAME_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s*-\s*(\d{1,2})h").unwrap_or_else(|_| unreachable!()));

/// Rewrites a free-text period label to `"HHh - Name"`.
///
/// Blank input gives an empty string; unrecognized labels pass through trimmed.
pub fn normalize_period(raw: &str) -> String {
    let label = raw.trim();
    if label.is_empty() {
        return String::new();
    }

    direct(label)
        .or_else(|| inverted(label))
        .or_else(|| hour_first(label))
        .or_else(|| name_first(label))
        .unwrap_or_else(|| label.to_string())
}

fn direct(label: &str) -> Option<String> {
    DIRECT
        .iter()
        .find(|canonical| **canonical == label)
        .map(|canonical| canonical.to_string())
}

fn inverted(label: &str) -> Option<String> {
    INVERTED
        .iter()
        .find(|(inverted, _)| *inverted == label)
        .map(|(_, canonical)| canonical.to_string())
}

fn hour_first(label: &str) -> Option<String> {
    let caps = HOUR_FIRST.captures(label)?;
    Some(format_label(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn name_first(label: &str) -> Option<String> {
    let caps = NAME_FIRST.captures(label)?;
    Some(format_label(caps.get(2)?.as_str(), caps.get(1)?.as_str()))
}

fn format_label(hour: &str, name: &str) -> String {
    format!("{:0>2}h - {}", hour, title_case(name))
}

/// The four daily count periods, in report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Madrugada,
    Manha,
    Tarde,
    Noite,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Madrugada, Period::Manha, Period::Tarde, Period::Noite];

    /// Classifies a period label by keyword, ignoring case and hour prefix.
    pub fn classify(label: &str) -> Option<Period> {
        let lower = label.to_lowercase();
        if lower.contains("madrug") {
            Some(Period::Madrugada)
        } else if lower.contains("manh") {
            Some(Period::Manha)
        } else if lower.contains("tarde") {
            Some(Period::Tarde)
        } else if lower.contains("noite") {
            Some(Period::Noite)
        } else {
            None
        }
    }

    /// Display name, e.g. `"Manhã"`.
    pub fn name(self) -> &'static str {
        match self {
            Period::Madrugada => "Madrugada",
            Period::Manha => "Manhã",
            Period::Tarde => "Tarde",
            Period::Noite => "Noite",
        }
    }

    /// Canonical label, e.g. `"10h - Manhã"`.
    pub fn label(self) -> &'static str {
        DIRECT[self.index()]
    }

    pub fn hour(self) -> &'static str {
        match self {
            Period::Madrugada => "05h",
            Period::Manha => "10h",
            Period::Tarde => "15h",
            Period::Noite => "20h",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Period::Madrugada => 0,
            Period::Manha => 1,
            Period::Tarde => 2,
            Period::Noite => 3,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_labels_pass_through() {
        for label in DIRECT {
            assert_eq!(normalize_period(label), *label);
        }
    }

    #[test]
    fn test_inverted_labels() {
        assert_eq!(normalize_period("Madrugada - 05h"), "05h - Madrugada");
        assert_eq!(normalize_period("Noite - 20h"), "20h - Noite");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(normalize_period("10h - Manhã "), "10h - Manhã");
        assert_eq!(normalize_period("  Tarde - 15h"), "15h - Tarde");
    }

    #[test]
    fn test_regex_fallbacks_pad_hour_and_title_case() {
        assert_eq!(normalize_period("5h-madrugada"), "05h - Madrugada");
        assert_eq!(normalize_period("10h -MANHÃ"), "10h - Manhã");
        assert_eq!(normalize_period("tarde- 3h"), "03h - Tarde");
    }

    #[test]
    fn test_blank_and_unknown() {
        assert_eq!(normalize_period(""), "");
        assert_eq!(normalize_period("   "), "");
        assert_eq!(normalize_period(" plantão extra "), "plantão extra");
    }

    #[test]
    fn test_classify() {
        assert_eq!(Period::classify("05h - Madrugada"), Some(Period::Madrugada));
        assert_eq!(Period::classify("manha"), Some(Period::Manha));
        assert_eq!(Period::classify("10h - Manhã"), Some(Period::Manha));
        assert_eq!(Period::classify("TARDE"), Some(Period::Tarde));
        assert_eq!(Period::classify("20h - Noite"), Some(Period::Noite));
        assert_eq!(Period::classify("plantão"), None);
    }

    #[test]
    fn test_labels_follow_column_order() {
        let labels: Vec<_> = Period::ALL.iter().map(|p| p.label()).collect();
        assert_eq!(labels, DIRECT);
        assert_eq!(Period::Noite.hour(), "20h");
    }
}
