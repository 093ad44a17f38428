use std::collections::HashSet;

use folio_core::{Money, Transaction};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::util::{alnum_upper, letters_upper, to_hex};

/// Number of most recently accepted records a fuzzy candidate is compared
/// against.
pub const FUZZY_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupeStrategy {
    /// Exact `(date, payee, amount, account)` key.
    #[default]
    Strict,
    /// Same letters-only payee, amount within a cent, dates within the drift.
    Fuzzy,
}

impl std::str::FromStr for DedupeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(DedupeStrategy::Strict),
            "fuzzy" => Ok(DedupeStrategy::Fuzzy),
            other => Err(format!("Unknown dedupe strategy: '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    pub dedupe: bool,
    pub strategy: DedupeStrategy,
    /// Largest date difference, in days, still considered the same event.
    pub max_date_drift: i64,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            dedupe: false,
            strategy: DedupeStrategy::Strict,
            max_date_drift: 2,
        }
    }
}

/// Stable identity of a record for strict deduplication. The amount
/// contributes its digits as written, so sign, `$` and separators are ignored
/// but `4.504` and `4.50` stay distinct.
pub fn strict_key(tx: &Transaction) -> String {
    let amount: String = tx.amount.chars().filter(char::is_ascii_digit).collect();
    let base = format!(
        "{}|{}|{}|{}",
        tx.date,
        alnum_upper(&tx.payee),
        amount,
        tx.account
    );
    to_hex(&Sha256::digest(base.as_bytes()))
}

fn unsigned_amount(tx: &Transaction) -> Decimal {
    tx.money().map(|m| m.abs().as_decimal()).unwrap_or_default()
}

pub struct Consolidator {
    options: ConsolidateOptions,
}

impl Consolidator {
    pub fn new(options: ConsolidateOptions) -> Self {
        Self { options }
    }

    /// Concatenate labelled batches in order. Records that already carry a
    /// source label keep it; nothing is dropped.
    pub fn merge<I>(&self, batches: I) -> Vec<Transaction>
    where
        I: IntoIterator<Item = (String, Vec<Transaction>)>,
    {
        let mut merged = Vec::new();
        let mut sources = 0usize;
        for (label, records) in batches {
            sources += 1;
            tracing::debug!("  {label}: {} transactions", records.len());
            merged.extend(records.into_iter().map(|mut tx| {
                if tx.source_file.is_none() {
                    tx.source_file = Some(label.clone());
                }
                tx
            }));
        }
        tracing::info!(
            "Total merged: {} transactions from {sources} sources",
            merged.len()
        );
        merged
    }

    /// Drop duplicates according to the configured strategy. A no-op unless
    /// deduplication is enabled.
    pub fn dedupe(&self, records: Vec<Transaction>) -> Vec<Transaction> {
        if !self.options.dedupe || records.is_empty() {
            return records;
        }
        let before = records.len();
        let unique = match self.options.strategy {
            DedupeStrategy::Strict => self.dedupe_strict(records),
            DedupeStrategy::Fuzzy => self.dedupe_fuzzy(records),
        };
        tracing::info!(
            "Deduplication: {before} → {} (removed {})",
            unique.len(),
            before - unique.len()
        );
        unique
    }

    fn dedupe_strict(&self, records: Vec<Transaction>) -> Vec<Transaction> {
        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter(|tx| seen.insert(strict_key(tx)))
            .collect()
    }

    fn dedupe_fuzzy(&self, records: Vec<Transaction>) -> Vec<Transaction> {
        let mut unique: Vec<Transaction> = Vec::with_capacity(records.len());
        for tx in records {
            let window_start = unique.len().saturating_sub(FUZZY_WINDOW);
            let duplicate = unique[window_start..]
                .iter()
                .any(|kept| self.is_fuzzy_duplicate(&tx, kept));
            if duplicate {
                tracing::debug!("Fuzzy duplicate dropped: {} {} {}", tx.date, tx.payee, tx.amount);
            } else {
                unique.push(tx);
            }
        }
        unique
    }

    /// Records without a parseable date never match.
    fn is_fuzzy_duplicate(&self, a: &Transaction, b: &Transaction) -> bool {
        let cent = Money::from_cents(1).as_decimal();
        if (unsigned_amount(a) - unsigned_amount(b)).abs() >= cent {
            return false;
        }
        if letters_upper(&a.payee) != letters_upper(&b.payee) {
            return false;
        }
        match (a.date.as_date(), b.date.as_date()) {
            (Some(da), Some(db)) => (da - db).num_days().abs() <= self.options.max_date_drift,
            _ => false,
        }
    }
}
