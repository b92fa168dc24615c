//! Stay pricing: nights between dates and the booking total.
//!
//! DESIGN
//! ======
//! Amounts are integer minor units (paise). The flat 18% tax is applied in
//! basis points and rounded half-up to the nearest minor unit, so a quote
//! always satisfies `total == subtotal + taxes` exactly. On the wire, amounts
//! are plain decimal numbers in major units (`8500`, `30090.5`), which is what
//! the data store holds.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Flat tax rate in basis points (18%).
pub const TAX_RATE_BPS: i64 = 1_800;

const BPS_DENOMINATOR: i64 = 10_000;
const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// MONEY
// =============================================================================

/// An amount of money in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);

    #[cfg(test)]
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    #[cfg(test)]
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Self(major.saturating_mul(MINOR_PER_MAJOR))
    }

    /// Convert a decimal major-unit amount, rounding to the nearest minor unit.
    /// Returns `None` for NaN, infinities, and values outside the `i64` range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_major_f64(major: f64) -> Option<Self> {
        if !major.is_finite() {
            return None;
        }
        let minor = (major * MINOR_PER_MAJOR as f64).round();
        if minor < i64::MIN as f64 || minor > i64::MAX as f64 {
            return None;
        }
        Some(Self(minor as i64))
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_major_f64(self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[must_use]
    pub fn saturating_mul(self, factor: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(factor)))
    }

    /// Apply a basis-point rate, rounding half away from zero.
    #[must_use]
    pub const fn apply_bps(self, bps: i64) -> Self {
        let scaled = self.0.saturating_mul(bps);
        let half = BPS_DENOMINATOR / 2;
        let rounded = if scaled >= 0 { scaled.saturating_add(half) } else { scaled.saturating_sub(half) };
        Self(rounded / BPS_DENOMINATOR)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / MINOR_PER_MAJOR.unsigned_abs();
        let minor = abs % MINOR_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{major}.{minor:02}")
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let major = f64::deserialize(deserializer)?;
        Self::from_major_f64(major).ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {major}")))
    }
}

// =============================================================================
// NIGHTS + QUOTE
// =============================================================================

/// Number of nights between check-in and check-out.
///
/// Zero when either date is missing or check-out is not strictly after
/// check-in. Dates carry no time of day, so the day difference is already
/// whole.
#[must_use]
pub fn nights(check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) -> u32 {
    let (Some(check_in), Some(check_out)) = (check_in, check_out) else {
        return 0;
    };
    if check_out <= check_in {
        return 0;
    }
    u32::try_from((check_out - check_in).num_days()).unwrap_or(u32::MAX)
}

/// Price breakdown for a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Quote {
    pub subtotal: Money,
    pub taxes: Money,
    pub total: Money,
}

/// Price `nights` at `nightly`. A non-positive nightly price quotes zero.
#[must_use]
pub fn quote(nights: u32, nightly: Money) -> Quote {
    if !nightly.is_positive() {
        return Quote::default();
    }
    let subtotal = nightly.saturating_mul(nights);
    let taxes = subtotal.apply_bps(TAX_RATE_BPS);
    Quote { subtotal, taxes, total: subtotal.saturating_add(taxes) }
}

#[cfg(test)]
#[path = "pricing_test.rs"]
mod tests;
