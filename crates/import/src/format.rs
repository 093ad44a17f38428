use std::borrow::Cow;
use std::fmt;

use folio_core::Transaction;

use crate::error::Result;
use crate::ofx::OfxVariant;
use crate::{beancount, camt, delimited, gnucash, ofx, qif, txf};

/// Every statement format the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Csv,
    Qif,
    Ofx,
    Qfx,
    Qbo,
    MsMoney,
    Txf,
    Beancount,
    GnuCash,
    Camt053,
}

impl Format {
    pub const ALL: [Format; 10] = [
        Format::Csv,
        Format::Qif,
        Format::Ofx,
        Format::Qfx,
        Format::Qbo,
        Format::MsMoney,
        Format::Txf,
        Format::Beancount,
        Format::GnuCash,
        Format::Camt053,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Qif => "qif",
            Format::Ofx => "ofx",
            Format::Qfx => "qfx",
            Format::Qbo => "qbo",
            Format::MsMoney => "msmoney",
            Format::Txf => "txf",
            Format::Beancount => "beancount",
            Format::GnuCash => "gnucash",
            Format::Camt053 => "camt053",
        }
    }

    /// Map a lowercased extension (with leading dot) to a format. Returns
    /// `None` when the extension says nothing reliable, e.g. `.csv` or `.xml`,
    /// and the content has to be sniffed.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext {
            ".qbo" => Some(Format::Qbo),
            ".ofx" => Some(Format::Ofx),
            ".qfx" => Some(Format::Qfx),
            ".qif" => Some(Format::Qif),
            ".txf" => Some(Format::Txf),
            ".mny" => Some(Format::MsMoney),
            ".gnucash" => Some(Format::GnuCash),
            ".camt053" => Some(Format::Camt053),
            ".beancount" => Some(Format::Beancount),
            e if e.contains("money") => Some(Format::MsMoney),
            _ => None,
        }
    }

    /// Parse a complete input in this format.
    pub fn parse(self, data: &[u8], opts: &ParseOptions) -> Result<ParsedBatch> {
        let text = decode_text(data);
        let batch = match self {
            Format::Csv => delimited::parse(&text, opts),
            Format::Qif => qif::parse(&text, opts),
            Format::Ofx | Format::Qfx => ofx::parse(&text, OfxVariant::Generic, opts),
            Format::Qbo => ofx::parse(&text, OfxVariant::Qbo, opts),
            Format::MsMoney => ofx::parse(&text, OfxVariant::MsMoney, opts),
            Format::Txf => txf::parse(&text, opts),
            Format::Beancount => beancount::parse(&text, opts),
            Format::GnuCash => gnucash::parse(&text, opts),
            Format::Camt053 => camt::parse(&text, opts),
        }?;
        if batch.skipped > 0 {
            tracing::debug!(
                "{self}: kept {} records, skipped {} unrecognised rows",
                batch.records.len(),
                batch.skipped
            );
        }
        Ok(batch)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let s = if s == "camt.053" { "camt053".to_string() } else { s };
        Format::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("Unknown input format: '{s}'"))
    }
}

/// Per-input context the parsers need but cannot read from the file.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Account name stamped on every record.
    pub account: String,
    /// Field separator for delimited text; detected when `None`.
    pub delimiter: Option<u8>,
}

impl ParseOptions {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            delimiter: None,
        }
    }
}

/// One parser invocation's output.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub records: Vec<Transaction>,
    /// Rows or records that were recognised as noise and dropped.
    pub skipped: usize,
}

/// Lossy UTF-8 with any byte-order mark removed.
pub fn decode_text(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    String::from_utf8_lossy(data)
}
