use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Formats tried, in order, when a source gives no explicit date layout.
pub const DEFAULT_FORMATS: &[&str] = &["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d", "%m-%d-%Y", "%d/%m/%Y"];

/// A transaction date.
///
/// Exports occasionally carry dates nothing can parse ("Various", truncated
/// timestamps). Those are kept verbatim as `Raw` so the value still reaches
/// the output instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TxnDate {
    Parsed(NaiveDate),
    Raw(String),
}

impl TxnDate {
    pub fn empty() -> Self {
        TxnDate::Raw(String::new())
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            TxnDate::Parsed(d) => Some(*d),
            TxnDate::Raw(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TxnDate::Raw(s) if s.is_empty())
    }

    /// Zero-padded `MM/DD/YYYY`, the layout Quicken's QIF importer expects.
    pub fn to_padded(&self) -> String {
        match self {
            TxnDate::Parsed(d) => d.format("%m/%d/%Y").to_string(),
            TxnDate::Raw(s) => s.clone(),
        }
    }

    pub fn to_iso(&self) -> String {
        match self {
            TxnDate::Parsed(d) => d.format("%Y-%m-%d").to_string(),
            TxnDate::Raw(s) => s.clone(),
        }
    }
}

impl Default for TxnDate {
    fn default() -> Self {
        TxnDate::empty()
    }
}

impl From<NaiveDate> for TxnDate {
    fn from(d: NaiveDate) -> Self {
        TxnDate::Parsed(d)
    }
}

/// `M/D/YYYY` without leading zeros.
impl fmt::Display for TxnDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnDate::Parsed(d) => write!(f, "{}/{}/{}", d.month(), d.day(), d.year()),
            TxnDate::Raw(s) => f.write_str(s),
        }
    }
}

impl Serialize for TxnDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxnDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(normalize_date(&s))
    }
}

/// Parse with an explicit list of `strftime` layouts.
///
/// Four-digit year layouts reject years below 1000 so that `1/2/24` falls
/// through to the two-digit `%y` layout instead of landing in year 24.
pub fn parse_with(s: &str, formats: &[&str]) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .filter(|d| !fmt.contains("%Y") || d.year() >= 1000)
    })
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_with(s, DEFAULT_FORMATS)
}

/// Parse against the default layouts, keeping the trimmed text on failure.
pub fn normalize_date(s: &str) -> TxnDate {
    normalize_with(s, DEFAULT_FORMATS)
}

pub fn normalize_with(s: &str, formats: &[&str]) -> TxnDate {
    match parse_with(s, formats) {
        Some(d) => TxnDate::Parsed(d),
        None => TxnDate::Raw(s.trim().to_string()),
    }
}
