//! Street address ("logradouro") splitting.
//!
//! A free-text address is split into street type, name, house number and
//! complement by an ordered chain of match attempts. Each step returns an
//! optional partial result and the first success wins; when nothing matches
//! the text degrades to a less populated [`ParsedAddress`] instead of failing.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Street-type keywords, most frequent first.
pub const STREET_TYPES: &[&str] = &[
    "Rua",
    "Avenida",
    "Alameda",
    "Praça",
    "Viaduto",
    "Terminal",
    "Largo",
    "Parque",
    "Passarela",
    "Travessa",
    "Viela",
    "Galeria",
    "Escadaria",
    "Jardim",
    "Quadra",
    "Rodovia",
    "Estrada",
    "Ladeira",
    "Beco",
    "Vila",
    "Conjunto",
    "Ponte",
    "Túnel",
    "Elevado",
    "Corredor",
    "Pátio",
    "Complexo",
];

const COMPLEMENT_SEPARATOR: &str = " - ";

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(\d+[A-Za-z]?)$").unwrap_or_else(|_| unreachable!()));

static STREET_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^({})\b", STREET_TYPES.join("|"))).unwrap_or_else(|_| unreachable!())
});

/// An address split into its parts, plus the canonical re-rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAddress {
    pub street_type: String,
    pub name: String,
    pub number: String,
    pub complement: String,
    pub canonical: String,
}

impl ParsedAddress {
    /// Builds an address from its parts, collapsing whitespace and deriving
    /// the canonical form.
    pub fn from_parts(street_type: &str, name: &str, number: &str, complement: &str) -> Self {
        let mut parsed = ParsedAddress {
            street_type: collapse_whitespace(street_type),
            name: collapse_whitespace(name),
            number: collapse_whitespace(number),
            complement: collapse_whitespace(complement),
            canonical: String::new(),
        };
        parsed.canonical = parsed.render();
        parsed
    }

    /// `"{type} {name}, {number} - {complement}"` with empty parts omitted.
    pub fn render(&self) -> String {
        let mut out = self.street_type.clone();
        if !self.name.is_empty() {
            out.push(' ');
            out.push_str(&self.name);
        }
        if !self.number.is_empty() {
            out.push_str(", ");
            out.push_str(&self.number);
        }
        if !self.complement.is_empty() {
            out.push_str(COMPLEMENT_SEPARATOR);
            out.push_str(&self.complement);
        }
        out.trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Leading house number used for ordering, `None` when absent or unparsable.
    pub fn house_number(&self) -> Option<u64> {
        leading_digits(&self.number)
    }
}

/// Splits a raw address. Blank input yields an all-empty result.
pub fn parse_address(raw: &str) -> ParsedAddress {
    let text = raw.trim();
    if text.is_empty() {
        return ParsedAddress::default();
    }

    let (main, complement) = split_complement(text);
    let (type_and_name, number) = split_number(main);
    let (street_type, name) = split_type(type_and_name);

    ParsedAddress::from_parts(&street_type, &name, number, complement)
}

fn split_complement(text: &str) -> (&str, &str) {
    match text.split_once(COMPLEMENT_SEPARATOR) {
        Some((main, complement)) => (main.trim(), complement.trim()),
        None => (text, ""),
    }
}

fn split_number(text: &str) -> (&str, &str) {
    split_on_comma(text)
        .or_else(|| split_trailing_number(text))
        .unwrap_or((text, ""))
}

fn split_on_comma(text: &str) -> Option<(&str, &str)> {
    text.split_once(',')
        .map(|(left, right)| (left.trim(), right.trim()))
}

fn split_trailing_number(text: &str) -> Option<(&str, &str)> {
    let caps = TRAILING_NUMBER.captures(text)?;
    let whole = caps.get(0)?;
    let number = caps.get(1)?;
    Some((text[..whole.start()].trim(), number.as_str()))
}

fn split_type(text: &str) -> (String, String) {
    split_known_type(text)
        .or_else(|| split_first_token(text))
        .unwrap_or_else(|| (String::new(), text.to_string()))
}

fn split_known_type(text: &str) -> Option<(String, String)> {
    let m = STREET_TYPE.captures(text)?.get(1)?;
    Some((title_case(m.as_str()), text[m.end()..].trim().to_string()))
}

fn split_first_token(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    let (first, rest) = trimmed.split_once(char::is_whitespace)?;
    Some((title_case(first), rest.trim().to_string()))
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }
    out
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn leading_digits(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
