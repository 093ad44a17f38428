use folio_core::{normalize_amount, normalize_date, Transaction, TxnDate};

use crate::error::Result;
use crate::format::{ParseOptions, ParsedBatch};

/// Fields collected between two `^` terminators.
#[derive(Default)]
struct PendingRecord {
    date: Option<TxnDate>,
    amount: Option<String>,
    payee: String,
    memo: String,
    category: String,
    check_number: String,
    touched: bool,
}

impl PendingRecord {
    fn finish(self, account: &str) -> Option<Transaction> {
        let (date, amount) = (self.date?, self.amount?);
        let mut tx = Transaction::new(date, &self.payee, &amount, account);
        tx.memo = self.memo;
        tx.category = self.category;
        tx.check_number = self.check_number;
        Some(tx)
    }
}

/// Quicken writes `1/2'24` for years after 1999.
fn qif_date(raw: &str) -> TxnDate {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '/' } else { c })
        .collect();
    normalize_date(&cleaned)
}

pub fn parse(text: &str, opts: &ParseOptions) -> Result<ParsedBatch> {
    let mut batch = ParsedBatch::default();
    let mut pending = PendingRecord::default();
    let mut mode: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(kind) = line.strip_prefix("!Type:") {
            mode = Some(kind.trim().to_string());
            continue;
        }
        if line == "^" {
            let record = std::mem::take(&mut pending);
            let touched = record.touched;
            match record.finish(&opts.account) {
                Some(tx) => batch.records.push(tx),
                None if !touched => {}
                None => {
                    tracing::debug!("Skipping QIF record without date or amount");
                    batch.skipped += 1;
                }
            }
            continue;
        }

        let mut chars = line.chars();
        let code = chars.next();
        let value = chars.as_str().trim();
        match code {
            Some('D') => pending.date = Some(qif_date(value)),
            Some('T') => pending.amount = Some(normalize_amount(value)),
            Some('P') => pending.payee = value.to_string(),
            Some('M') => pending.memo = value.to_string(),
            Some('L') => pending.category = value.to_string(),
            Some('N') => pending.check_number = value.to_string(),
            _ => continue,
        }
        pending.touched = true;
    }

    if pending.touched {
        tracing::debug!("Dropping unterminated trailing QIF record");
        batch.skipped += 1;
    }
    if let Some(mode) = mode {
        tracing::debug!("QIF section type {mode}: {} records", batch.records.len());
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str) -> ParsedBatch {
        parse(text, &ParseOptions::new("Checking")).unwrap()
    }

    #[test]
    fn single_bank_record() {
        let batch = parse_str("!Type:Bank\nD1/2/2024\nT-45.00\nPCOFFEE SHOP\n^\n");
        assert_eq!(batch.records.len(), 1);
        let tx = &batch.records[0];
        assert_eq!(tx.date.to_string(), "1/2/2024");
        assert_eq!(tx.payee, "COFFEE SHOP");
        assert_eq!(tx.amount, "-45.00");
        assert_eq!(tx.account, "Checking");
        assert_eq!(tx.memo, "");
    }

    #[test]
    fn optional_fields() {
        let batch = parse_str("D01/05/24\nT1,250.00\nPEMPLOYER\nMJanuary pay\nLIncome:Salary\nN1001\n^\n");
        let tx = &batch.records[0];
        assert_eq!(tx.date.to_string(), "1/5/2024");
        assert_eq!(tx.amount, "1250.00");
        assert_eq!(tx.memo, "January pay");
        assert_eq!(tx.category, "Income:Salary");
        assert_eq!(tx.check_number, "1001");
    }

    #[test]
    fn apostrophe_year() {
        let batch = parse_str("D1/2'05\nT-1\n^\n");
        assert_eq!(batch.records[0].date.to_string(), "1/2/2005");
    }

    #[test]
    fn records_need_date_and_amount() {
        let batch = parse_str("PNO DATE\nT-5.00\n^\nD1/3/2024\nPNO AMOUNT\n^\nD1/4/2024\nT2\n^\n");
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.records[0].payee, "");
    }

    #[test]
    fn trailing_record_without_terminator_is_dropped() {
        let batch = parse_str("D1/2/2024\nT-1\n^\nD1/3/2024\nT-2\n");
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn type_header_resets_nothing() {
        let batch = parse_str("!Type:Bank\nD1/2/2024\n!Type:CCard\nT-3\n^\n");
        assert_eq!(batch.records.len(), 1);
    }
}
