//! # Money Module
//!
//! Monetary values in centavos. Prices on `price_product`, line prices and
//! discounts on `proposal_detail_vehicle`, and sale totals are all stored as
//! integer cents and wrapped in [`Money`] when arithmetic is needed.
//!
//! ## Usage
//! ```rust
//! use crm_core::money::Money;
//!
//! let unit = Money::from_cents(45_990_000); // R$ 459.900,00
//! let line = unit * 2 - Money::from_cents(1_000_000);
//! assert_eq!(line.cents(), 90_980_000);
//! assert_eq!(line.to_string(), "R$ 909.800,00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// A monetary value in the smallest currency unit (centavos for BRL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
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
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Whole reais, truncated toward zero.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Centavos part, always 0-99.
    #[inline]
    pub const fn centavos(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// `None` on overflow.
    pub const fn checked_add(self, rhs: Money) -> Option<Money> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` on overflow.
    pub const fn checked_sub(self, rhs: Money) -> Option<Money> {
        match self.0.checked_sub(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` on overflow.
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Clamps negative values to zero (a discount larger than the line).
    pub fn non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }
}

// Operators saturate at the i64 bounds. Use the `checked_*` methods where
// overflow must be reported.

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, qty: i64) -> Money {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

/// Brazilian formatting: `R$ 1.234,56`, `-R$ 0,50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.reais().abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}R$ {},{:02}", sign, grouped, self.centavos())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
