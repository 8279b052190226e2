//! Brazilian Real amounts: parsing form input and formatting for display.

use std::{fmt, str::FromStr};

use bigdecimal::{num_traits::ToPrimitive, BigDecimal, RoundingMode};
use serde::Serialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("'{0}' is not a numeric amount")]
    NotNumeric(String),

    #[error("'{0}' is outside the supported range")]
    OutOfRange(String),
}

/// Largest accepted magnitude, R$ 100 bilhões. Keeps report sums well inside
/// `i64`.
pub const MAX_CENTS: i64 = 10_000_000_000_000;

/// An amount of money in centavos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Rounds half-up to centavos. Magnitudes above [`MAX_CENTS`] are
    /// rejected.
    pub fn from_decimal(value: &BigDecimal) -> Result<Self, CurrencyError> {
        let (digits, _) = value
            .with_scale_round(2, RoundingMode::HalfUp)
            .into_bigint_and_exponent();
        digits
            .to_i64()
            .filter(|cents| cents.unsigned_abs() <= MAX_CENTS.unsigned_abs())
            .map(Self)
            .ok_or_else(|| CurrencyError::OutOfRange(value.to_string()))
    }

    /// Plain `1234.56` notation, used by the export and chart values.
    pub fn to_plain_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

/// Renders as `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let units = (abs / 100).to_string();
        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, c) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "R$ {sign}{grouped},{:02}", abs % 100)
    }
}

/// Parses `R$ 1.234,56`, `1.234,56` or `1234,56`.
///
/// Every `.` is a thousands separator and is dropped, so `1234.56` reads as
/// `123456`.
pub fn parse_brl(raw: &str) -> Result<BigDecimal, CurrencyError> {
    let cleaned: String = raw
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if !is_decimal_literal(&cleaned) {
        return Err(CurrencyError::NotNumeric(raw.to_string()));
    }

    BigDecimal::from_str(&cleaned).map_err(|_| CurrencyError::NotNumeric(raw.to_string()))
}

/// Optional sign, digits, at most one decimal point.
fn is_decimal_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    !(int.is_empty() && frac.is_empty())
        && int.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
}

/// Parses form input straight into centavos.
pub fn parse_money(raw: &str) -> Result<Money, CurrencyError> {
    Money::from_decimal(&parse_brl(raw)?)
}
