use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use folio_core::{DebitCredit, Transaction, TxnDate};
use roxmltree::{Document, Node};
use rust_decimal::Decimal;

use crate::error::{ParseError, Result};
use crate::format::{ParseOptions, ParsedBatch};
use crate::xml;

const LABEL: &str = "GnuCash";

const GNC: &str = "http://www.gnucash.org/XML/gnc";
const TRN: &str = "http://www.gnucash.org/XML/trn";
const TS: &str = "http://www.gnucash.org/XML/ts";
const SPLIT: &str = "http://www.gnucash.org/XML/split";

/// Split values are stored as exact rationals, e.g. `-4523/100`.
fn parse_fraction(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    match raw.split_once('/') {
        Some((num, den)) => {
            let num = Decimal::from_str(num.trim()).ok()?;
            let den = Decimal::from_str(den.trim()).ok()?;
            num.checked_div(den)
        }
        None => Decimal::from_str(raw).ok(),
    }
}

fn parse_gnc_date(raw: &str) -> TxnDate {
    let raw = raw.trim();
    if raw.is_empty() {
        return TxnDate::empty();
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return dt.date_naive().into();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.date().into();
    }
    TxnDate::Raw(raw.to_string())
}

/// Value of the first split that parses to a non-zero amount; the first
/// parseable value otherwise.
fn transaction_value(txn: Node) -> Decimal {
    let mut value = None;
    let splits = xml::child(txn, Some(TRN), "splits")
        .into_iter()
        .flat_map(|s| xml::children(s, Some(TRN), "split"));
    for split in splits {
        let raw = xml::path_text(split, Some(SPLIT), &["value"]);
        let Some(v) = parse_fraction(if raw.is_empty() { "0" } else { raw.as_str() }) else {
            continue;
        };
        value = Some(v);
        if !v.is_zero() {
            break;
        }
    }
    value.unwrap_or_default()
}

fn to_record(txn: Node, account: &str) -> Transaction {
    let description = xml::path_text(txn, Some(TRN), &["description"]);
    let posted = xml::child(txn, Some(TRN), "date-posted")
        .map(|d| xml::path_text(d, Some(TS), &["date"]))
        .unwrap_or_default();

    let value = transaction_value(txn);
    let payee = if description.is_empty() {
        "Unknown"
    } else {
        description.as_str()
    };
    let amount = format!("{:.2}", value.abs());

    let mut tx = Transaction::new(parse_gnc_date(&posted), payee, &amount, account);
    tx.debit_credit = Some(if value.is_sign_negative() && !value.is_zero() {
        DebitCredit::Debit
    } else {
        DebitCredit::Credit
    });
    tx.memo = description.clone();
    tx
}

/// Parse an uncompressed GnuCash XML book. The account name is always the
/// caller's; the book's own account tree is not consulted.
pub fn parse(text: &str, opts: &ParseOptions) -> Result<ParsedBatch> {
    let doc = Document::parse(text).map_err(|e| ParseError::from_xml(LABEL, text, &e))?;

    let records: Vec<Transaction> = xml::descendants(doc.root(), Some(GNC), "transaction")
        .map(|txn| to_record(txn, &opts.account))
        .collect();

    if records.is_empty() {
        return Err(ParseError::empty(LABEL));
    }
    Ok(ParsedBatch {
        records,
        skipped: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<gnc-v2
     xmlns:gnc="http://www.gnucash.org/XML/gnc"
     xmlns:trn="http://www.gnucash.org/XML/trn"
     xmlns:ts="http://www.gnucash.org/XML/ts"
     xmlns:split="http://www.gnucash.org/XML/split">
<gnc:book version="2.0.0">
<gnc:transaction version="2.0.0">
  <trn:date-posted><ts:date>2024-12-05 10:59:00 +0000</ts:date></trn:date-posted>
  <trn:description>SAFEWAY</trn:description>
  <trn:splits>
    <trn:split><split:value>0/100</split:value></trn:split>
    <trn:split><split:value>-4523/100</split:value></trn:split>
    <trn:split><split:value>4523/100</split:value></trn:split>
  </trn:splits>
</gnc:transaction>
<gnc:transaction version="2.0.0">
  <trn:date-posted><ts:date>2024-12-06 08:00:00</ts:date></trn:date-posted>
  <trn:description></trn:description>
  <trn:splits>
    <trn:split><split:value>150000/100</split:value></trn:split>
  </trn:splits>
</gnc:transaction>
<gnc:transaction version="2.0.0">
  <trn:date-posted><ts:date>sometime</ts:date></trn:date-posted>
  <trn:description>NO SPLITS</trn:description>
</gnc:transaction>
</gnc:book>
</gnc-v2>"#;

    #[test]
    fn fractions_are_exact() {
        assert_eq!(parse_fraction("-4523/100"), Decimal::from_str("-45.23").ok());
        assert_eq!(parse_fraction("1/3").map(|d| d.round_dp(4)), Decimal::from_str("0.3333").ok());
        assert_eq!(parse_fraction("7"), Some(Decimal::from(7)));
        assert_eq!(parse_fraction("1/0"), None);
        assert_eq!(parse_fraction("x/100"), None);
    }

    #[test]
    fn first_nonzero_split_sets_amount_and_polarity() {
        let batch = parse(BOOK, &ParseOptions::new("Checking")).unwrap();
        assert_eq!(batch.records.len(), 3);

        let tx = &batch.records[0];
        assert_eq!(tx.date.to_string(), "12/5/2024");
        assert_eq!(tx.payee, "SAFEWAY");
        assert_eq!(tx.memo, "SAFEWAY");
        assert_eq!(tx.amount, "45.23");
        assert_eq!(tx.debit_credit, Some(DebitCredit::Debit));
        assert_eq!(tx.account, "Checking");
        assert_eq!(tx.signed_money().unwrap().to_cents(), -4523);
    }

    #[test]
    fn blank_description_and_naive_timestamp() {
        let tx = &parse(BOOK, &ParseOptions::new("Checking")).unwrap().records[1];
        assert_eq!(tx.payee, "Unknown");
        assert_eq!(tx.date.to_string(), "12/6/2024");
        assert_eq!(tx.amount, "1500.00");
        assert_eq!(tx.debit_credit, Some(DebitCredit::Credit));
    }

    #[test]
    fn missing_splits_give_zero_and_raw_date() {
        let tx = &parse(BOOK, &ParseOptions::new("Checking")).unwrap().records[2];
        assert_eq!(tx.amount, "0.00");
        assert_eq!(tx.date, TxnDate::Raw("sometime".to_string()));
    }

    #[test]
    fn errors() {
        let empty = r#"<gnc-v2 xmlns:gnc="http://www.gnucash.org/XML/gnc"><gnc:book/></gnc-v2>"#;
        assert!(matches!(
            parse(empty, &ParseOptions::default()),
            Err(ParseError::Empty { .. })
        ));
        assert!(matches!(
            parse("<gnc-v2><broken></gnc-v2>", &ParseOptions::default()),
            Err(ParseError::Structural { .. })
        ));
    }
}
