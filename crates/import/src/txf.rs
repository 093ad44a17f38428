use std::collections::HashMap;

use folio_core::date::normalize_with;
use folio_core::{normalize_amount, Transaction, TxnDate};

use crate::error::Result;
use crate::format::{ParseOptions, ParsedBatch};

const TXF_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d"];

/// Legacy record shapes, numbered as in the TXF v042 documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Bare record, or an `X` detail line without description/dates.
    Format0,
    /// One amount.
    Format1,
    /// Description, no amount.
    Format2,
    /// Description and one amount.
    Format3,
    /// Acquired/sold dates with cost and proceeds.
    Format4,
    /// As format 4 plus a wash-sale or adjustment amount.
    Format5,
    /// Detail line with description and dates.
    Format6,
}

impl RecordLayout {
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// The fixed-column `X` detail line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailLine {
    pub date: String,
    pub account_name: String,
    pub check_number: String,
    pub payee: String,
    pub memo: String,
    pub category: String,
}

/// Column ranges (in characters, after the `X` code is removed) of each
/// detail field. These offsets are the only place the layout is encoded.
pub fn decode_detail(value: &str) -> DetailLine {
    let chars: Vec<char> = value.chars().collect();
    let field = |start: usize, end: usize| -> String {
        let (start, end) = (start.min(chars.len()), end.min(chars.len()));
        chars[start..end].iter().collect::<String>().trim().to_string()
    };
    DetailLine {
        date: field(1, 9),
        account_name: field(10, 40),
        check_number: field(41, 47),
        payee: field(48, 88),
        memo: field(89, 129),
        category: field(130, 145),
    }
}

/// One `^`-terminated record: line codes to their values, in order.
#[derive(Debug, Default)]
struct TxfRecord {
    fields: HashMap<char, Vec<String>>,
}

impl TxfRecord {
    fn from_block(block: &str) -> Self {
        let mut fields: HashMap<char, Vec<String>> = HashMap::new();
        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut chars = line.chars();
            if let Some(code) = chars.next() {
                // Detail lines are column-addressed, so keep their leading blanks.
                let value = match code {
                    'X' => chars.as_str().trim_end(),
                    _ => chars.as_str().trim(),
                };
                fields.entry(code).or_default().push(value.to_string());
            }
        }
        Self { fields }
    }

    fn all(&self, code: char) -> &[String] {
        self.fields.get(&code).map(Vec::as_slice).unwrap_or_default()
    }

    fn first(&self, code: char) -> Option<&str> {
        self.all(code).first().map(String::as_str)
    }

    fn has(&self, code: char) -> bool {
        self.fields.contains_key(&code)
    }
}

fn classify(record: &TxfRecord) -> RecordLayout {
    let dates = record.all('D').len();
    let amounts = record.all('$').len();
    let has_desc = record.has('P');

    if record.has('X') {
        return if has_desc && dates > 0 {
            RecordLayout::Format6
        } else {
            RecordLayout::Format0
        };
    }
    match (dates, amounts, has_desc) {
        (2, 2, _) => RecordLayout::Format4,
        (2, 3, _) => RecordLayout::Format5,
        (_, 1, true) => RecordLayout::Format3,
        (_, 0, true) => RecordLayout::Format2,
        (_, 1, false) => RecordLayout::Format1,
        _ => RecordLayout::Format0,
    }
}

/// "Various" is how brokers mark lots with several acquisition dates.
fn txf_date(raw: &str) -> TxnDate {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("various") {
        return TxnDate::empty();
    }
    normalize_with(raw, TXF_DATE_FORMATS)
}

fn to_record(record: &TxfRecord, account: &str) -> Transaction {
    let detail = record.first('X').map(decode_detail).unwrap_or_default();
    let reference = record.first('N').unwrap_or_default();

    let dates = record.all('D');
    let acquired = dates.first().map(|d| txf_date(d)).unwrap_or_default();
    let sold = dates.get(1).map(|d| txf_date(d)).unwrap_or_default();
    let date = [sold, acquired, txf_date(&detail.date)]
        .into_iter()
        .find(|d| !d.is_empty())
        .unwrap_or_default();

    let payee = if !detail.payee.is_empty() {
        detail.payee.clone()
    } else {
        match record.first('P') {
            Some(desc) if !desc.is_empty() => desc.to_string(),
            _ => format!("TXF {reference}"),
        }
    };

    let amount = record.first('$').map(normalize_amount).unwrap_or_else(|| "0".to_string());
    let mut tx = Transaction::new(date, &payee, &amount, account);
    tx.category = detail.category;
    tx.check_number = detail.check_number;
    tx.memo = if detail.memo.is_empty() {
        format!("TXF Ref {reference}")
    } else {
        detail.memo
    };
    tx
}

pub fn parse(text: &str, opts: &ParseOptions) -> Result<ParsedBatch> {
    let mut batch = ParsedBatch::default();
    let mut header_seen = false;

    for block in text.split('^').map(str::trim).filter(|b| !b.is_empty()) {
        let record = TxfRecord::from_block(block);
        if !header_seen && record.has('V') {
            header_seen = true;
            continue;
        }
        let layout = classify(&record);
        tracing::debug!("TXF record layout {}", layout.number());
        batch.records.push(to_record(&record, &opts.account));
    }
    Ok(batch)
}
