//! Budget and year normalization for the staged table.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;

use super::records::{FINAL_COLUMNS, FilmRecord};

/// Budgets above this are clamped.
pub const BUDGET_CAP_USD: f64 = 1e7;

/// Returned when a budget is present but not understood.
pub const UNPARSED_BUDGET: f64 = -1.0;

/// Year value used when no four-digit year is found.
pub const UNKNOWN_YEAR: &str = "0";

/// Name of the column added by cleaning.
pub const BUDGET_USD_COLUMN: &str = "budget_usd";

/// Captures currency symbol, amount and an optional multiplier word.
#[allow(clippy::expect_used)]
static BUDGET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([$₤£])+\s*([0-9]+(?:[.,][0-9]+)*)\s*([a-z]+)?").expect("budget regex is valid")
});

#[allow(clippy::expect_used)]
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}").expect("year regex is valid"));

fn currency_rate(symbol: &str) -> Option<f64> {
    match symbol {
        "$" => Some(1.0),
        "£" => Some(1.32),
        "₤" => Some(1.2),
        _ => None,
    }
}

fn multiplier(word: &str) -> Option<f64> {
    match word {
        "" => Some(1.0),
        "million" => Some(1e6),
        "billion" => Some(1e9),
        _ => None,
    }
}

/// Converts a published budget into US dollars.
///
/// Missing budgets are `0`. Text that does not look like a budget, or uses a
/// multiplier other than `million`/`billion`, is [`UNPARSED_BUDGET`]. The
/// result never exceeds [`BUDGET_CAP_USD`].
///
/// ```
/// use filmfetch_core::pipeline::clean_budget;
///
/// assert_eq!(clean_budget(Some("$2 million")), 2_000_000.0);
/// assert_eq!(clean_budget(Some("$379,000")), 379_000.0);
/// assert_eq!(clean_budget(None), 0.0);
/// ```
#[must_use]
pub fn clean_budget(budget: Option<&str>) -> f64 {
    let Some(budget) = budget else {
        return 0.0;
    };
    let text = budget.trim().to_lowercase();

    let Some(captures) = BUDGET_PATTERN.captures(&text) else {
        trace!(budget, "budget not recognized");
        return UNPARSED_BUDGET;
    };

    let symbol = captures.get(1).map_or("", |m| m.as_str());
    let word = captures.get(3).map_or("", |m| m.as_str());
    let amount = captures
        .get(2)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());

    match (amount, currency_rate(symbol), multiplier(word)) {
        (Some(amount), Some(rate), Some(factor)) => (amount * rate * factor).min(BUDGET_CAP_USD),
        _ => {
            trace!(budget, "budget has an unknown amount or multiplier");
            UNPARSED_BUDGET
        }
    }
}

/// First four-digit run of a year label, or [`UNKNOWN_YEAR`].
///
/// `"1927 / 28 (1st)"` becomes `"1927"`.
#[must_use]
pub fn clean_year(year: Option<&str>) -> String {
    year.and_then(|y| YEAR_PATTERN.find(y))
        .map_or_else(|| UNKNOWN_YEAR.to_string(), |m| m.as_str().to_string())
}

/// A raw film row after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanFilmRecord {
    /// Raw columns, with `year` reduced to four digits.
    #[serde(flatten)]
    pub record: FilmRecord,
    /// Budget in US dollars.
    pub budget_usd: f64,
}

impl CleanFilmRecord {
    /// Cleans one raw row.
    #[must_use]
    pub fn from_record(record: &FilmRecord) -> Self {
        let budget_usd = clean_budget(record.budget.as_deref());
        let mut record = record.clone();
        record.year = Some(clean_year(record.year.as_deref()));
        Self { record, budget_usd }
    }

    /// Header of the staged table.
    #[must_use]
    pub fn header() -> Vec<&'static str> {
        FINAL_COLUMNS
            .iter()
            .copied()
            .chain(std::iter::once(BUDGET_USD_COLUMN))
            .collect()
    }

    /// Cells in [`CleanFilmRecord::header`] order.
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        let mut cells = self.record.cells();
        cells.push(format!("{:?}", self.budget_usd));
        cells
    }
}

/// Cleans every raw row, keeping order.
#[must_use]
pub fn clean_records(records: &[FilmRecord]) -> Vec<CleanFilmRecord> {
    records.iter().map(CleanFilmRecord::from_record).collect()
}
