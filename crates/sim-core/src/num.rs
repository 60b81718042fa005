//! Arbitrary-magnitude numbers for the string economy.
//!
//! Wraps the external `break_infinity` decimal (mantissa × 10^exponent over
//! doubles) behind a small adapter so the rest of the workspace only sees
//! add/sub/mul/div/pow/log10/compare plus string round-trips. Swapping the
//! backing library touches this file only.

use break_infinity::Decimal;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Adapter over the backing big-number library.
///
/// Values are non-negative in practice (the economy never produces negative
/// quantities), but the type itself does not enforce a sign.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Big(Decimal);

impl Big {
    pub fn zero() -> Self {
        Big(Decimal::new(0.0))
    }

    pub fn one() -> Self {
        Big(Decimal::new(1.0))
    }

    pub fn from_f64(value: f64) -> Self {
        Big(Decimal::new(value))
    }

    pub fn from_u64(value: u64) -> Self {
        // Purchase counts stay far below 2^53, so the f64 hop is lossless.
        Big(Decimal::new(value as f64))
    }

    /// Exact power of ten; the base-cost table is built from these.
    pub fn pow10(exponent: f64) -> Self {
        Big::from_f64(10.0).pow(exponent)
    }

    /// Parse a decimal string, falling back on anything unparseable.
    ///
    /// Persisted payloads run through this, so a corrupted field degrades to
    /// its documented default instead of failing the whole load.
    pub fn parse_or(text: &str, fallback: Big) -> Big {
        match Decimal::from_str(text.trim()) {
            Ok(d) if !d.to_number().is_nan() => Big(d),
            _ => fallback,
        }
    }

    pub fn pow(&self, exponent: f64) -> Big {
        Big(self.0.pow(&Decimal::new(exponent)))
    }

    pub fn log10(&self) -> f64 {
        self.0.log10()
    }

    pub fn max(&self, other: &Big) -> Big {
        if other > self {
            other.clone()
        } else {
            self.clone()
        }
    }

    pub fn min(&self, other: &Big) -> Big {
        if other < self {
            other.clone()
        } else {
            self.clone()
        }
    }

    /// Lossy conversion for display and diagnostics; saturates to infinity
    /// beyond f64 range.
    pub fn to_f64(&self) -> f64 {
        self.0.to_number()
    }

    pub fn is_zero(&self) -> bool {
        *self == Big::zero()
    }
}

impl Default for Big {
    fn default() -> Self {
        Big::zero()
    }
}

impl fmt::Display for Big {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for &Big {
    type Output = Big;
    fn add(self, rhs: &Big) -> Big {
        Big(self.0.clone() + rhs.0.clone())
    }
}

impl Sub for &Big {
    type Output = Big;
    fn sub(self, rhs: &Big) -> Big {
        Big(self.0.clone() - rhs.0.clone())
    }
}

impl Mul for &Big {
    type Output = Big;
    fn mul(self, rhs: &Big) -> Big {
        Big(self.0.clone() * rhs.0.clone())
    }
}

impl Div for &Big {
    type Output = Big;
    fn div(self, rhs: &Big) -> Big {
        Big(self.0.clone() / rhs.0.clone())
    }
}

impl Add for Big {
    type Output = Big;
    fn add(self, rhs: Big) -> Big {
        &self + &rhs
    }
}

impl Sub for Big {
    type Output = Big;
    fn sub(self, rhs: Big) -> Big {
        &self - &rhs
    }
}

impl Mul for Big {
    type Output = Big;
    fn mul(self, rhs: Big) -> Big {
        &self * &rhs
    }
}

impl Div for Big {
    type Output = Big;
    fn div(self, rhs: Big) -> Big {
        &self / &rhs
    }
}
