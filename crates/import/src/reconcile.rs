use std::collections::HashSet;

use folio_core::{Money, Transaction};

/// Outcome of comparing an import against a statement balance and/or an
/// existing register.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub imported_total: Money,
    pub target_balance: Option<Money>,
    /// `target - imported`, when a target was given.
    pub difference: Option<Money>,
    pub register_total: Option<Money>,
    /// `register - imported`, when a register was given.
    pub register_difference: Option<Money>,
    /// Register entries with no imported record of the same payee and amount.
    pub missing: Vec<Transaction>,
}

impl ReconcileReport {
    /// `None` when there was no target balance to check against.
    pub fn is_reconciled(&self) -> Option<bool> {
        self.difference
            .map(|d| d.abs() < Money::from_cents(1))
    }
}

fn total(records: &[Transaction]) -> Money {
    records.iter().filter_map(Transaction::signed_money).sum()
}

fn match_key(tx: &Transaction) -> Option<(String, i64)> {
    let cents = tx.signed_money()?.to_cents();
    Some((tx.payee.trim().to_uppercase(), cents))
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    target_balance: Option<Money>,
    register: Option<Vec<Transaction>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, balance: Money) -> Self {
        self.target_balance = Some(balance);
        self
    }

    /// Compare against records read from a register export.
    pub fn with_register(mut self, register: Vec<Transaction>) -> Self {
        self.register = Some(register);
        self
    }

    pub fn run(&self, imported: &[Transaction]) -> ReconcileReport {
        let imported_total = total(imported);
        let mut report = ReconcileReport {
            imported_total,
            target_balance: self.target_balance,
            difference: self.target_balance.map(|t| t - imported_total),
            ..Default::default()
        };

        if let Some(register) = &self.register {
            let register_total = total(register);
            report.register_total = Some(register_total);
            report.register_difference = Some(register_total - imported_total);

            let known: HashSet<(String, i64)> = imported.iter().filter_map(match_key).collect();
            report.missing = register
                .iter()
                .filter(|tx| match_key(tx).map_or(true, |k| !known.contains(&k)))
                .cloned()
                .collect();
        }

        tracing::info!("Imported total: {}", report.imported_total);
        if let (Some(target), Some(diff)) = (report.target_balance, report.difference) {
            tracing::info!("Target ending balance: {target}, difference: {diff}");
        }
        if !report.missing.is_empty() {
            tracing::warn!(
                "{} register transactions not found in import",
                report.missing.len()
            );
        }
        report
    }
}
