use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Symbol entry ──────────────────────────────────────────────────────────────

/// One selectable instrument in the ticker universe.
///
/// `code` is the identifier the price provider understands (market suffix
/// already applied for domestic listings, e.g. "005930.KS"); `name` is the
/// human-readable label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolEntry {
    pub code: String,
    pub name: String,
}

impl SymbolEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    /// Display label shown in the selector, e.g. "AAPL - Apple Inc.".
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }

    /// Inverse of `display_name`; resolves a selector value back into a
    /// code/name pair.
    pub fn parse_display(label: &str) -> Option<Self> {
        let (code, name) = label.split_once(" - ")?;
        let code = code.trim();
        let name = name.trim();
        if code.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(code, name))
    }
}

impl fmt::Display for SymbolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

// ── Period window ─────────────────────────────────────────────────────────────

/// Historical span understood by the price provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Period {
    #[value(name = "1mo")]
    OneMonth,
    #[value(name = "3mo")]
    ThreeMonths,
    #[value(name = "6mo")]
    SixMonths,
    #[value(name = "1y")]
    OneYear,
    #[value(name = "max")]
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::Max => "max",
        }
    }

    pub const ALL: [Period; 5] = [
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::Max,
    ];
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "max" => Ok(Period::Max),
            other => Err(format!("unknown period '{}'", other)),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Price table ───────────────────────────────────────────────────────────────

/// One per-period OHLCV record, plus the derived indicator fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<i64>,
    /// 20-period simple moving average of close. None for the first 19 rows.
    pub ma20: Option<f64>,
    /// Close minus previous close. None for the first row.
    pub daily_change: Option<f64>,
}

impl PriceRow {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            ma20: None,
            daily_change: None,
        }
    }
}

/// Date-ordered price history for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceTable {
    pub symbol: String,
    pub rows: Vec<PriceRow>,
}

impl PriceTable {
    pub fn new(symbol: impl Into<String>, rows: Vec<PriceRow>) -> Self {
        Self {
            symbol: symbol.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── News item ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
}

// ── Tagged fetch result ───────────────────────────────────────────────────────

/// Outcome of an external fetch. Providers never raise into the caller:
/// an unreachable provider becomes `Failed`, a reachable provider with no
/// rows becomes `Empty`, so callers pattern-match instead of catching.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    Empty,
    Failed(String),
}

impl<T> Fetched<T> {
    pub fn data(self) -> Option<T> {
        match self {
            Fetched::Data(t) => Some(t),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
