use std::str::FromStr;

use chrono::NaiveDate;
use folio_core::{DebitCredit, Transaction, TxnDate};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::format::{ParseOptions, ParsedBatch};
use crate::util::re;

re!(re_txn_header, r#"^(\d{4}-\d{2}-\d{2})[ \t]+[*!](.*)$"#);
re!(re_quoted, r#""([^"]*)""#);
re!(
    re_posting,
    r"^[ \t]{2,}([A-Z][A-Za-z0-9:\-]*)(?:[ \t]+([-+]?\d[\d,.]*)(?:[ \t]+([A-Z]{3}))?)?"
);

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Posting {
    account: String,
    amount: Option<String>,
    currency: Option<String>,
}

impl Posting {
    fn is_asset(&self) -> bool {
        self.account.starts_with("Assets") || self.account.starts_with("Liabilities")
    }

    fn is_expense(&self) -> bool {
        self.account.starts_with("Expenses") || self.account.starts_with("Income")
    }
}

#[derive(Debug)]
struct Entry {
    date: String,
    payee: String,
    narration: String,
    postings: Vec<Posting>,
}

fn header(line: &str) -> Option<Entry> {
    let caps = re_txn_header().captures(line)?;
    let rest = caps[2].trim();
    let quoted: Vec<&str> = re_quoted()
        .captures_iter(rest)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let (payee, narration) = match quoted.as_slice() {
        [] => (rest.to_string(), String::new()),
        [only] => (only.to_string(), String::new()),
        [payee, narration, ..] => (payee.to_string(), narration.to_string()),
    };
    Some(Entry {
        date: caps[1].to_string(),
        payee: payee.trim().to_string(),
        narration: narration.trim().to_string(),
        postings: Vec::new(),
    })
}

fn posting(line: &str) -> Option<Posting> {
    let caps = re_posting().captures(line)?;
    Some(Posting {
        account: caps[1].to_string(),
        amount: caps.get(2).map(|m| m.as_str().to_string()),
        currency: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// Only the simple two-posting shape is mapped faithfully: the
/// asset/liability leg gives amount and account, the expense/income leg
/// gives the category.
fn to_record(entry: Entry, account: &str) -> Option<Transaction> {
    let first = entry.postings.first()?;
    let last = entry.postings.last()?;
    let asset = entry.postings.iter().find(|p| p.is_asset()).unwrap_or(first);
    let expense = entry.postings.iter().find(|p| p.is_expense()).unwrap_or(last);

    let value = asset
        .amount
        .as_deref()
        .or(expense.amount.as_deref())
        .and_then(|a| Decimal::from_str(&a.replace(',', "")).ok())
        .unwrap_or_default();
    let currency = asset
        .currency
        .as_deref()
        .or(expense.currency.as_deref())
        .unwrap_or(DEFAULT_CURRENCY);

    let date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d")
        .map(TxnDate::Parsed)
        .unwrap_or_else(|_| TxnDate::Raw(entry.date.clone()));
    let account = if account.is_empty() {
        asset.account.as_str()
    } else {
        account
    };

    let mut tx = Transaction::new(date, &entry.payee, &format!("{value:.2}"), account);
    tx.debit_credit = Some(if value.is_sign_negative() && !value.is_zero() {
        DebitCredit::Debit
    } else {
        DebitCredit::Credit
    });
    tx.category = expense.account.clone();
    tx.memo = entry.narration.clone();
    tx.currency = Some(currency.to_string());
    Some(tx)
}

pub fn parse(text: &str, opts: &ParseOptions) -> Result<ParsedBatch> {
    let mut batch = ParsedBatch::default();
    let mut current: Option<Entry> = None;

    let flush = |entry: Option<Entry>, batch: &mut ParsedBatch| {
        if let Some(entry) = entry {
            match to_record(entry, &opts.account) {
                Some(tx) => batch.records.push(tx),
                None => batch.skipped += 1,
            }
        }
    };

    for line in text.lines() {
        if let Some(entry) = header(line) {
            flush(current.replace(entry), &mut batch);
            continue;
        }
        let indented = line.starts_with([' ', '\t']);
        match current.as_mut() {
            Some(entry) if indented => {
                if let Some(p) = posting(line) {
                    entry.postings.push(p);
                }
            }
            Some(_) if !line.trim().is_empty() => flush(current.take(), &mut batch),
            _ => {}
        }
    }
    flush(current.take(), &mut batch);

    tracing::debug!("Parsed {} Beancount transactions", batch.records.len());
    Ok(batch)
}
