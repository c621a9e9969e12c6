//! Exact decimal lengths using dashu
//!
//! Cycle lengths are entered as decimals ("28.25") and their fractional
//! parts accumulate into leap instances over many loops, so they are kept
//! as exact rationals (dashu-ratio's RBig). Floats never enter the engine.

use dashu_int::{IBig, UBig};
use dashu_ratio::RBig;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::CalendarError;

/// Largest power of ten tried when rendering a terminating decimal
const MAX_DISPLAY_PLACES: u32 = 18;

/// Exact non-integer-capable length of a time unit instance
///
/// Parses "4", "28.25", "-1.5" and "1/3". Arithmetic never rounds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Length {
    inner: RBig,
}

impl Length {
    // ========== Construction ==========

    /// Create from an integer
    pub fn from_i64(n: i64) -> Self {
        Self { inner: RBig::from(IBig::from(n)) }
    }

    /// Create from an exact ratio; `None` for a zero denominator
    pub fn from_ratio(num: i64, den: u64) -> Option<Self> {
        if den == 0 {
            return None;
        }
        Some(Self {
            inner: RBig::from_parts(IBig::from(num), UBig::from(den)),
        })
    }

    fn parse_decimal(s: &str) -> Result<RBig, CalendarError> {
        let invalid = || CalendarError::InvalidLength(s.to_string());

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        // "12.345" -> 12345 / 10^3
        let combined = format!("{}{}", whole, frac);
        let numerator: IBig = combined.parse().map_err(|_| invalid())?;
        let places = u32::try_from(frac.len()).map_err(|_| invalid())?;
        let denominator = UBig::from(10u8).pow(places as usize);
        let numerator = if negative { -numerator } else { numerator };

        Ok(RBig::from_parts(numerator, denominator))
    }

    fn parse_fraction(s: &str, num: &str, den: &str) -> Result<RBig, CalendarError> {
        let invalid = || CalendarError::InvalidLength(s.to_string());
        let numerator: IBig = num.trim().parse().map_err(|_| invalid())?;
        let denominator: UBig = den.trim().parse().map_err(|_| invalid())?;
        if denominator == UBig::ZERO {
            return Err(invalid());
        }
        Ok(RBig::from_parts(numerator, denominator))
    }

    // ========== Predicates ==========

    pub fn is_zero(&self) -> bool {
        self.inner == RBig::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.inner > RBig::ZERO
    }

    pub fn is_integer(&self) -> bool {
        *self.inner.denominator() == UBig::ONE
    }

    // ========== Parts ==========

    /// Largest integer not above this length; `None` outside the i64 range
    pub fn whole(&self) -> Option<i64> {
        i64::try_from(self.inner.floor()).ok()
    }

    /// Fractional part in [0, 1), measured from the floor
    pub fn fraction(&self) -> Length {
        Self {
            inner: &self.inner - RBig::from(self.inner.floor()),
        }
    }

    /// Reduced denominator, if it fits in a u64
    pub fn denominator(&self) -> Option<u64> {
        u64::try_from(self.inner.denominator()).ok()
    }

    /// `floor(self * n)` computed exactly; `None` outside the i128 range
    pub fn floor_mul(&self, n: i64) -> Option<i128> {
        let product = &self.inner * RBig::from(IBig::from(n));
        i128::try_from(product.floor()).ok()
    }

    // ========== Arithmetic ==========

    pub fn add(&self, other: &Self) -> Self {
        Self { inner: &self.inner + &other.inner }
    }

    pub fn mul_i64(&self, n: i64) -> Self {
        Self { inner: &self.inner * RBig::from(IBig::from(n)) }
    }

    // ========== Display ==========

    /// Render as a terminating decimal when one exists, else as "a/b"
    fn render(&self) -> String {
        if self.is_integer() {
            return self.inner.numerator().to_string();
        }

        let denominator = match self.denominator() {
            Some(d) => d,
            None => return self.inner.to_string(),
        };

        // Find 10^k divisible by the denominator
        let mut scale: u64 = 1;
        for places in 1..=MAX_DISPLAY_PLACES {
            scale *= 10;
            if scale % denominator != 0 {
                continue;
            }

            let factor = IBig::from(scale / denominator);
            let scaled = self.inner.numerator() * factor;
            let negative = scaled < IBig::ZERO;
            let digits = if negative { (-scaled).to_string() } else { scaled.to_string() };
            let places = places as usize;
            let padded = format!("{:0>width$}", digits, width = places + 1);
            let (whole, frac) = padded.split_at(padded.len() - places);
            let frac = frac.trim_end_matches('0');
            let sign = if negative { "-" } else { "" };
            return format!("{}{}.{}", sign, whole, frac);
        }

        self.inner.to_string()
    }
}

impl Default for Length {
    fn default() -> Self {
        Self::from_i64(1)
    }
}

impl FromStr for Length {
    type Err = CalendarError;

    /// Supports: "123", "3.25", "1/3", "-42"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let inner = match s.split_once('/') {
            Some((num, den)) => Self::parse_fraction(s, num, den)?,
            None => Self::parse_decimal(s)?,
        };
        Ok(Self { inner })
    }
}

impl From<i64> for Length {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct LengthVisitor;

impl<'de> Visitor<'de> for LengthVisitor {
    type Value = Length;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal length such as 28.25, as a number or a string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Length, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Length, E> {
        Ok(Length::from_i64(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Length, E> {
        i64::try_from(v)
            .map(Length::from_i64)
            .map_err(|_| E::custom(format!("length {} out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Length, E> {
        // Shortest round-trip text keeps "28.25" exact
        if !v.is_finite() {
            return Err(E::custom("length must be finite"));
        }
        v.to_string().parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LengthVisitor)
    }
}
