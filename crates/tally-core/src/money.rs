//! # Money
//!
//! Every drawer amount is a whole number of cents.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  opening_balance ──┐                                                    │
//! │  cash_sales (live) ┼──► expected_cash ──┐                               │
//! │  Σ expenses ───────┘                    ├──► difference (signed)        │
//! │  actual_cash (counted at close) ────────┘                               │
//! │                                                                         │
//! │  All of it is i64 arithmetic: 0.10 + 0.20 is exactly 0.30, so a close   │
//! │  never reports a phantom fraction of a cent.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use tally_core::money::Money;
//!
//! let opening: Money = "5000".parse().unwrap();
//! let expected = opening + Money::from_major_minor(2000, 0) - Money::from_major_minor(500, 0);
//! assert_eq!(expected.to_string(), "6500.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// An amount in cents. Negative only for a drawer that came up short.
///
/// Arithmetic saturates at the `i64` bounds instead of wrapping; the
/// validators cap inputs well below them, but a sales total from outside
/// is not validated.
///
/// Serializes as the bare integer, in storage and over the API alike.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// `from_major_minor(-50, 25)` is -50.25; the sign rides on `major`.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        let minor = if major < 0 { -minor } else { minor };
        Money(major * 100 + minor)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Renders with a currency prefix, e.g. `-Rs 50.00` for `"Rs "`.
    pub fn display_with(&self, symbol: &str) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{symbol}{}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(""))
    }
}

/// Parses `"6450"`, `"6450.5"`, `"6450.50"` or `"-50.00"`. More than two
/// decimal places is rejected rather than rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{s}' {reason}"),
        };

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("is not a decimal amount"));
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("has more than two decimal places"));
        }

        let major: i64 = whole.parse().map_err(|_| invalid("is out of range"))?;
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("is out of range"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("is out of range"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("is out of range"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

macro_rules! money_ops {
    ($($trait:ident::$method:ident, $assign:ident::$assign_method:ident => $op:ident;)*) => {
        $(
            impl $trait for Money {
                type Output = Money;

                #[inline]
                fn $method(self, rhs: Money) -> Money {
                    Money(self.0.$op(rhs.0))
                }
            }

            impl $assign for Money {
                #[inline]
                fn $assign_method(&mut self, rhs: Money) {
                    *self = $trait::$method(*self, rhs);
                }
            }
        )*
    };
}

money_ops! {
    Add::add, AddAssign::add_assign => saturating_add;
    Sub::sub, SubAssign::sub_assign => saturating_sub;
}

impl Neg for Money {
    type Output = Money;

    #[inline]
    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
