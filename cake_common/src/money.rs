use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "LKR";

const MINOR_UNITS: i64 = 100;

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money, counted in minor currency units (cents). All prices, totals and gateway amounts in the system
/// use this type so that arithmetic is exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / MINOR_UNITS, abs % MINOR_UNITS)
    }
}

/// Parses decimal strings such as `1200`, `1200.5` or `1200.50`. More than two fractional digits, signs, and anything
/// that is not a plain decimal number are rejected rather than rounded.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || MoneyConversionError(format!("'{s}' is not a valid amount"));
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, ""),
        };
        if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if minor.len() > 2 || !minor.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let major = major.parse::<i64>().map_err(|_| invalid())?;
        let minor = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => minor.parse::<i64>().map_err(|_| invalid())?,
        };
        major.checked_mul(MINOR_UNITS).and_then(|m| m.checked_add(minor)).map(Self).ok_or_else(invalid)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS)
    }

    /// The whole number of major units in this amount, rounded towards zero.
    pub fn major_units(&self) -> i64 {
        self.0 / MINOR_UNITS
    }

    /// `percent`% of this amount, rounded down to the nearest minor unit.
    pub fn percent(&self, percent: i64) -> Self {
        Self(self.0 * percent / 100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The amount as a decimal string with exactly two fractional digits, e.g. `1200.00`.
    pub fn to_decimal_string(&self) -> String {
        self.to_string()
    }
}
