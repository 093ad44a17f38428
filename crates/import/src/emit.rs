use std::collections::HashSet;
use std::io::Write;

use folio_core::{normalize_amount, DebitCredit, Transaction, QUICKEN_COLUMNS, REQUIRED_COLUMNS};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// How much of the output schema a CSV carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compliance {
    /// Only `Date, Payee, Amount, Account`.
    Loose,
    #[default]
    Standard,
    Strict,
}

impl Compliance {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Compliance::Loose => REQUIRED_COLUMNS,
            Compliance::Standard | Compliance::Strict => QUICKEN_COLUMNS,
        }
    }
}

impl std::str::FromStr for Compliance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loose" => Ok(Compliance::Loose),
            "standard" => Ok(Compliance::Standard),
            "strict" => Ok(Compliance::Strict),
            other => Err(format!("Unknown compliance level: '{other}'")),
        }
    }
}

/// Quicken-compatible CSV with a header row.
pub fn write_csv<W: Write>(
    records: &[Transaction],
    out: W,
    compliance: Compliance,
) -> Result<usize, EmitError> {
    let columns = compliance.columns();
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(columns)?;
    for tx in records {
        writer.write_record(tx.columns(columns))?;
    }
    writer.flush()?;
    tracing::debug!("Wrote {} CSV rows", records.len());
    Ok(records.len())
}

const UNCATEGORIZED: &str = "Uncategorized";

/// QIF bank register with zero-padded four-digit-year dates.
pub fn write_qif<W: Write>(records: &[Transaction], mut out: W) -> Result<usize, EmitError> {
    writeln!(out, "!Type:Bank")?;
    for tx in records {
        let category = if tx.category.is_empty() {
            UNCATEGORIZED
        } else {
            tx.category.as_str()
        };
        writeln!(out, "D{}", tx.date.to_padded())?;
        writeln!(out, "P{}", tx.payee)?;
        writeln!(out, "T{}", normalize_amount(&tx.amount))?;
        writeln!(out, "L{category}")?;
        writeln!(out, "M{}", tx.memo)?;
        writeln!(out, "^")?;
    }
    out.flush()?;
    Ok(records.len())
}

const DEFAULT_CATEGORY_ACCOUNT: &str = "Expenses:Uncategorized";

fn category_account(tx: &Transaction) -> &str {
    if tx.category.is_empty() {
        DEFAULT_CATEGORY_ACCOUNT
    } else {
        &tx.category
    }
}

/// Two-posting Beancount journal. `Account` is the asset side and
/// `Category` the expense/income side; a record's own currency overrides
/// `currency`.
pub fn write_beancount<W: Write>(
    records: &[Transaction],
    mut out: W,
    currency: &str,
) -> Result<usize, EmitError> {
    if records.is_empty() {
        tracing::warn!("No transactions to write");
        return Ok(0);
    }

    let mut opened = HashSet::new();
    for tx in records {
        let ccy = tx.currency.as_deref().unwrap_or(currency);
        for account in [tx.account.as_str(), category_account(tx)] {
            if !account.is_empty() && opened.insert(account) {
                writeln!(out, "1970-01-01 open {account} {ccy}")?;
            }
        }
    }
    writeln!(out)?;

    for tx in records {
        let ccy = tx.currency.as_deref().unwrap_or(currency);
        let money = tx.money().unwrap_or_default();
        let outflow = tx.debit_credit == Some(DebitCredit::Debit) || money.is_negative();
        let (source, destination) = if outflow {
            (tx.account.as_str(), category_account(tx))
        } else {
            (category_account(tx), tx.account.as_str())
        };
        let sign = if outflow { "-" } else { "" };

        writeln!(
            out,
            "{} * \"{}\" \"{}\"",
            tx.date.to_iso(),
            tx.payee.replace('"', "'"),
            tx.memo.replace('"', "'")
        )?;
        writeln!(out, "  {source:<40}  {sign}{} {ccy}", money.abs())?;
        writeln!(out, "  {destination}")?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(records.len())
}
