use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(Decimal);

impl Money {
    /// Parse a loosely formatted amount: thousands separators, `$`, inner
    /// spaces, an explicit `+`, and accounting parentheses are all accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let cleaned = clean_amount(s);
        let unsigned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if unsigned.is_empty() {
            return None;
        }
        Decimal::from_str(unsigned).ok().map(Money)
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100))
            .round()
            .to_i64()
            .unwrap_or_default()
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }
}

/// Two decimal places, sign only when negative.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

fn clean_amount(value: &str) -> String {
    let v: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    match v.strip_prefix('(').and_then(|inner| inner.strip_suffix(')')) {
        Some(inner) => format!("-{inner}"),
        None => v,
    }
}

/// Normalise an amount field to a signed decimal string.
///
/// The source's own notation is preserved where it is already a valid
/// decimal (`-45.00` stays `-45.00`, `+12` stays `+12`). Anything that does
/// not parse becomes `0` so every record's amount is a finite decimal.
pub fn normalize_amount(value: &str) -> String {
    let cleaned = clean_amount(value);
    if Money::parse(&cleaned).is_some() {
        cleaned
    } else {
        "0".to_string()
    }
}
