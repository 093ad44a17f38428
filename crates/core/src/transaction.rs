use serde::{Deserialize, Serialize};
use std::fmt;

use super::date::TxnDate;
use super::money::Money;

/// Output column order of the Quicken-compatible CSV schema.
pub const QUICKEN_COLUMNS: &[&str] = &[
    "Date",
    "Payee",
    "FI Payee",
    "Amount",
    "Debit/Credit",
    "Category",
    "Account",
    "Tag",
    "Memo",
    "Chknum",
];

/// Columns emitted in the reduced ("loose") compliance mode.
pub const REQUIRED_COLUMNS: &[&str] = &["Date", "Payee", "Amount", "Account"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebitCredit {
    Debit,
    Credit,
}

impl fmt::Display for DebitCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebitCredit::Debit => write!(f, "Debit"),
            DebitCredit::Credit => write!(f, "Credit"),
        }
    }
}

impl std::str::FromStr for DebitCredit {
    type Err = String;

    /// Accepts the spelled-out forms and the ISO 20022 `DBIT`/`CRDT` codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" | "dbit" | "d" => Ok(DebitCredit::Debit),
            "credit" | "crdt" | "c" => Ok(DebitCredit::Credit),
            other => Err(format!("Unknown debit/credit indicator: '{other}'")),
        }
    }
}

/// The canonical transaction record every parser produces.
///
/// `date`, `payee`, `amount` and `account` are plain values rather than
/// options: a parser that has nothing for them leaves them empty, so
/// consumers never branch on presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: TxnDate,
    pub payee: String,
    pub fi_payee: String,
    pub amount: String,
    pub debit_credit: Option<DebitCredit>,
    pub category: String,
    pub account: String,
    pub tag: String,
    pub memo: String,
    pub check_number: String,
    /// Provenance label, set only by the consolidator.
    pub source_file: Option<String>,
    /// ISO currency code when the source states one.
    pub currency: Option<String>,
}

impl Transaction {
    pub fn new(date: TxnDate, payee: &str, amount: &str, account: &str) -> Self {
        Transaction {
            date,
            payee: payee.to_string(),
            amount: amount.to_string(),
            account: account.to_string(),
            ..Default::default()
        }
    }

    /// The amount as written, ignoring any Debit/Credit flag.
    pub fn money(&self) -> Option<Money> {
        Money::parse(&self.amount)
    }

    /// The amount with polarity applied: an unsigned amount flagged `Debit`
    /// is treated as an outflow.
    pub fn signed_money(&self) -> Option<Money> {
        let m = self.money()?;
        let explicit_sign = self.amount.trim_start().starts_with(['-', '+', '(']);
        match self.debit_credit {
            Some(DebitCredit::Debit) if !explicit_sign => Some(-m.abs()),
            _ => Some(m),
        }
    }

    /// Value of a Quicken schema column, by header name.
    pub fn column(&self, name: &str) -> Option<String> {
        let value = match name {
            "Date" => self.date.to_string(),
            "Payee" => self.payee.clone(),
            "FI Payee" => self.fi_payee.clone(),
            "Amount" => self.amount.clone(),
            "Debit/Credit" => self
                .debit_credit
                .map(|dc| dc.to_string())
                .unwrap_or_default(),
            "Category" => self.category.clone(),
            "Account" => self.account.clone(),
            "Tag" => self.tag.clone(),
            "Memo" => self.memo.clone(),
            "Chknum" => self.check_number.clone(),
            "SourceFile" => self.source_file.clone().unwrap_or_default(),
            "Currency" => self.currency.clone().unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }

    /// Set a column from its textual form. Returns `false` for names outside
    /// the schema so callers can count or ignore them.
    pub fn set_column(&mut self, name: &str, value: &str) -> bool {
        let value = value.trim();
        match name {
            "Date" => self.date = super::date::normalize_date(value),
            "Payee" => self.payee = value.to_string(),
            "FI Payee" => self.fi_payee = value.to_string(),
            "Amount" => self.amount = super::money::normalize_amount(value),
            "Debit/Credit" => self.debit_credit = value.parse().ok(),
            "Category" => self.category = value.to_string(),
            "Account" => self.account = value.to_string(),
            "Tag" => self.tag = value.to_string(),
            "Memo" => self.memo = value.to_string(),
            "Chknum" => self.check_number = value.to_string(),
            "SourceFile" => self.source_file = Some(value.to_string()).filter(|s| !s.is_empty()),
            "Currency" => self.currency = Some(value.to_string()).filter(|s| !s.is_empty()),
            _ => return false,
        }
        true
    }

    pub fn columns(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|n| self.column(n).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Transaction {
        let date = TxnDate::Parsed(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        Transaction::new(date, "COFFEE SHOP", "-45.00", "Checking")
    }

    #[test]
    fn new_fills_required_fields() {
        let tx = sample();
        assert_eq!(tx.date.to_string(), "1/2/2024");
        assert_eq!(tx.payee, "COFFEE SHOP");
        assert_eq!(tx.amount, "-45.00");
        assert_eq!(tx.account, "Checking");
        assert!(tx.category.is_empty());
        assert!(tx.debit_credit.is_none());
    }

    #[test]
    fn columns_follow_schema_order() {
        let row = sample().columns(QUICKEN_COLUMNS);
        assert_eq!(
            row,
            vec!["1/2/2024", "COFFEE SHOP", "", "-45.00", "", "", "Checking", "", "", ""]
        );
    }

    #[test]
    fn set_column_round_trips() {
        let mut tx = Transaction::default();
        for (name, value) in [
            ("Date", "01/15/2024"),
            ("Payee", "GROCER"),
            ("Amount", "1,200.00"),
            ("Debit/Credit", "Credit"),
            ("Chknum", "1001"),
        ] {
            assert!(tx.set_column(name, value));
        }
        assert!(!tx.set_column("Running Bal.", "5.00"));
        assert_eq!(tx.column("Date").unwrap(), "1/15/2024");
        assert_eq!(tx.column("Amount").unwrap(), "1200.00");
        assert_eq!(tx.column("Debit/Credit").unwrap(), "Credit");
        assert_eq!(tx.column("Chknum").unwrap(), "1001");
    }

    #[test]
    fn debit_flag_makes_unsigned_amount_negative() {
        let mut tx = sample();
        tx.amount = "45.00".to_string();
        tx.debit_credit = Some(DebitCredit::Debit);
        assert_eq!(tx.signed_money().unwrap().to_cents(), -4500);

        tx.debit_credit = Some(DebitCredit::Credit);
        assert_eq!(tx.signed_money().unwrap().to_cents(), 4500);
    }

    #[test]
    fn debit_credit_accepts_iso_codes() {
        assert_eq!("DBIT".parse::<DebitCredit>(), Ok(DebitCredit::Debit));
        assert_eq!("crdt".parse::<DebitCredit>(), Ok(DebitCredit::Credit));
        assert!("maybe".parse::<DebitCredit>().is_err());
    }
}
