//! Anchor-based extraction of energy readings from the AISEG2 status page.
//!
//! The page layout is fixed: one `span` per daily total, plus a circuit table
//! with a variable number of rows. Parsing is a pure function of the document
//! text so it can be tested against fixture markup without network access.

use crate::error::AppError;
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    KilowattHours,
    Watts,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::KilowattHours => "kWh",
            Unit::Watts => "W",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    TotalUsage,
    TotalBuy,
    TotalSell,
    TotalGeneration,
    Circuit,
}

impl Category {
    /// The four totals in the order they are reported.
    pub const TOTALS: [Category; 4] = [
        Category::TotalUsage,
        Category::TotalBuy,
        Category::TotalSell,
        Category::TotalGeneration,
    ];

    /// Stable identity key; circuits append their index via
    /// [`MetricReading::circuit`].
    pub fn key(&self) -> &'static str {
        match self {
            Category::TotalUsage => "total_use_kwh",
            Category::TotalBuy => "buy_kwh",
            Category::TotalSell => "sell_kwh",
            Category::TotalGeneration => "gen_kwh",
            Category::Circuit => "circuit",
        }
    }

    pub fn display_name(&self, circuit_index: Option<u16>) -> String {
        match self {
            Category::TotalUsage => "Total Energy Today".into(),
            Category::TotalBuy => "Purchased Energy Today".into(),
            Category::TotalSell => "Sold Energy Today".into(),
            Category::TotalGeneration => "Generated Energy Today".into(),
            Category::Circuit => format!("Circuit {}", circuit_index.unwrap_or_default()),
        }
    }

    fn anchor(&self) -> &'static str {
        match self {
            Category::TotalUsage => "span#val_use_kwh",
            Category::TotalBuy => "span#val_buy_kwh",
            Category::TotalSell => "span#val_sell_kwh",
            Category::TotalGeneration => "span#val_gen_kwh",
            Category::Circuit => "td.circuit_kwh",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    pub identity: String,
    pub value: f64,
    pub unit: Unit,
    pub category: Category,
    pub circuit_index: Option<u16>,
}

impl MetricReading {
    pub fn total(category: Category, value: f64) -> Self {
        Self {
            identity: category.key().to_string(),
            value,
            unit: Unit::KilowattHours,
            category,
            circuit_index: None,
        }
    }

    pub fn circuit(index: u16, value: f64) -> Self {
        Self {
            identity: circuit_identity(index),
            value,
            unit: Unit::KilowattHours,
            category: Category::Circuit,
            circuit_index: Some(index),
        }
    }
}

pub fn circuit_identity(index: u16) -> String {
    format!("c{index}_kwh")
}

const CIRCUIT_TABLE: &str = "table#circuit_list";
const CIRCUIT_ROW: &str = "tr.circuit_row";
const CIRCUIT_NO: &str = "td.circuit_no";

/// Parse the monitor's status document into readings: the four totals in
/// category order, then circuits ascending by index. A missing total anchor
/// or circuit table means the layout changed (or a login page came back) and
/// fails the whole parse; a blank circuit value only skips that circuit.
pub fn parse_status(document: &str) -> Result<Vec<MetricReading>, AppError> {
    let doc = Html::parse_document(document);
    let mut readings = Vec::new();

    for category in Category::TOTALS {
        let anchor = category.anchor();
        let el = doc
            .select(&selector(anchor)?)
            .next()
            .ok_or_else(|| AppError::Parse(format!("missing anchor {anchor}")))?;
        let text = cell_text(&el);
        let value = parse_kwh(&text)
            .map_err(|e| AppError::Parse(format!("{anchor}: {e}")))?
            .ok_or_else(|| AppError::Parse(format!("{anchor}: empty value cell")))?;
        readings.push(MetricReading::total(category, value));
    }

    let table = doc
        .select(&selector(CIRCUIT_TABLE)?)
        .next()
        .ok_or_else(|| AppError::Parse(format!("missing anchor {CIRCUIT_TABLE}")))?;
    let row_sel = selector(CIRCUIT_ROW)?;
    let no_sel = selector(CIRCUIT_NO)?;
    let val_sel = selector(Category::Circuit.anchor())?;

    let mut circuits: Vec<(u16, f64)> = Vec::new();
    for row in table.select(&row_sel) {
        let index_text = row
            .select(&no_sel)
            .next()
            .map(|el| cell_text(&el))
            .ok_or_else(|| AppError::Parse("circuit row missing index cell".into()))?;
        let index: u16 = index_text
            .trim()
            .parse()
            .map_err(|_| AppError::Parse(format!("bad circuit index {index_text:?}")))?;
        let value_text = row
            .select(&val_sel)
            .next()
            .map(|el| cell_text(&el))
            .ok_or_else(|| AppError::Parse(format!("circuit {index} missing value cell")))?;
        match parse_kwh(&value_text) {
            // circuit not reporting yet; skip this cycle
            Ok(None) => continue,
            Ok(Some(value)) => circuits.push((index, value)),
            Err(e) => return Err(AppError::Parse(format!("circuit {index}: {e}"))),
        }
    }

    circuits.sort_by_key(|(index, _)| *index);
    circuits.dedup_by_key(|(index, _)| *index);
    readings.extend(
        circuits
            .into_iter()
            .map(|(index, value)| MetricReading::circuit(index, value)),
    );

    Ok(readings)
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::Parse(format!("invalid selector {css}: {e:?}")))
}

fn cell_text(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

/// Parse a display cell into kWh. Tolerates thousands separators, full-width
/// punctuation and a `kWh`/`Wh` suffix. Returns `Ok(None)` for a blank or
/// dash-only cell, and an error for anything else that is not a number.
fn parse_kwh(raw: &str) -> Result<Option<f64>, String> {
    let normalized: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '\u{ff0c}' => ',', // full-width comma
            '\u{ff0e}' => '.', // full-width period
            other => other,
        })
        .collect();

    if normalized.is_empty() || normalized.chars().all(|c| matches!(c, '-' | '\u{2015}' | '\u{30fc}')) {
        return Ok(None);
    }

    let lower = normalized.to_ascii_lowercase();
    let (number_part, factor) = if let Some(stripped) = lower.strip_suffix("kwh") {
        (stripped, 1.0)
    } else if let Some(stripped) = lower.strip_suffix("wh") {
        (stripped, 0.001)
    } else {
        (lower.as_str(), 1.0)
    };

    let cleaned: String = number_part
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let value: f64 = cleaned
        .parse()
        .map_err(|_| format!("non-numeric value {raw:?}"))?;
    Ok(Some(value * factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_plain_and_suffixed_numbers() {
        assert_eq!(parse_kwh("12.5").unwrap(), Some(12.5));
        assert_eq!(parse_kwh(" 12.5kWh ").unwrap(), Some(12.5));
        assert_eq!(parse_kwh("1,234.5").unwrap(), Some(1234.5));
        assert_eq!(parse_kwh("1250Wh").unwrap(), Some(1.25));
        assert_eq!(parse_kwh("0").unwrap(), Some(0.0));
    }

    #[test]
    fn normalizes_full_width_punctuation() {
        assert_eq!(parse_kwh("1，234．5").unwrap(), Some(1234.5));
    }

    #[test]
    fn blank_and_dash_cells_are_none() {
        assert_eq!(parse_kwh("").unwrap(), None);
        assert_eq!(parse_kwh("  ").unwrap(), None);
        assert_eq!(parse_kwh("-").unwrap(), None);
        assert_eq!(parse_kwh("---").unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error_not_zero() {
        assert!(parse_kwh("n/a").is_err());
        assert!(parse_kwh("12.5.3").is_err());
    }

    #[test]
    fn circuit_identities_are_stable() {
        assert_eq!(circuit_identity(3), "c3_kwh");
        assert_eq!(MetricReading::circuit(3, 1.2).identity, "c3_kwh");
        assert_eq!(
            MetricReading::total(Category::TotalBuy, 1.0).identity,
            "buy_kwh"
        );
    }
}
