//! Fixed-point safety margins.
//!
//! A [`Margin`] is a non-negative fraction `numerator / denominator` used to
//! scale balances up by `(1 + margin)`. Scaling is multiply-then-divide on
//! `u128` with an explicit ceiling, so large balances never lose precision
//! the way a floating-point `* 1.05` would.

use core::fmt;
use core::str::FromStr;

use serde::Serialize;

use crate::error::{PrimitiveError, PrimitiveResult};
use crate::types::Balance;

/// Largest accepted denominator (18 fractional decimal digits).
pub const MAX_DENOMINATOR: u128 = 1_000_000_000_000_000_000;

/// Largest accepted margin, as a multiple of the denominator (100 = +10000%).
pub const MAX_RATIO: u128 = 100;

/// A non-negative safety margin expressed as an exact fraction.
///
/// Equality compares values, so `"0.05"` equals `"0.050"` and `"5%"`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Margin {
    numerator: u128,
    denominator: u128,
}

impl Margin {
    /// No margin: `apply_ceil(v) == v`.
    pub const ZERO: Margin = Margin {
        numerator: 0,
        denominator: 1,
    };

    /// Build a margin from an explicit fraction.
    ///
    /// Rejects a zero denominator, denominators above [`MAX_DENOMINATOR`],
    /// and margins above [`MAX_RATIO`].
    pub fn new(numerator: u128, denominator: u128) -> PrimitiveResult<Self> {
        if denominator == 0 {
            return Err(PrimitiveError::InvalidMargin("zero denominator".into()));
        }
        if denominator > MAX_DENOMINATOR {
            return Err(PrimitiveError::InvalidMargin(format!(
                "denominator {} exceeds {}",
                denominator, MAX_DENOMINATOR
            )));
        }
        let cap = denominator.saturating_mul(MAX_RATIO);
        if numerator > cap {
            return Err(PrimitiveError::InvalidMargin(format!(
                "{}/{} exceeds the maximum ratio of {}",
                numerator, denominator, MAX_RATIO
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Margin of `percent`/100.
    pub fn from_percent(percent: u32) -> Self {
        Self {
            numerator: u128::from(percent).min(100 * MAX_RATIO),
            denominator: 100,
        }
    }

    pub fn numerator(&self) -> u128 {
        self.numerator
    }

    pub fn denominator(&self) -> u128 {
        self.denominator
    }

    /// Compute `ceil(value * (1 + margin))`.
    ///
    /// Returns `None` only if the result does not fit in a `u128`.
    pub fn apply_ceil(&self, value: Balance) -> Option<Balance> {
        let factor = self.denominator.checked_add(self.numerator)?;
        let quotient = value / self.denominator;
        let remainder = value % self.denominator;

        let high = quotient.checked_mul(factor)?;
        // remainder < denominator <= 1e18 and factor <= 101e18, so this fits.
        let low_num = remainder.checked_mul(factor)?;
        let mut low = low_num / self.denominator;
        if low_num % self.denominator != 0 {
            low += 1;
        }
        high.checked_add(low)
    }

    /// True if `observed` is larger than `base` scaled up by this margin.
    /// An overflowing bound is treated as never exceeded.
    pub fn is_exceeded(&self, base: Balance, observed: Balance) -> bool {
        match self.apply_ceil(base) {
            Some(bound) => observed > bound,
            None => false,
        }
    }
}

impl PartialEq for Margin {
    fn eq(&self, other: &Self) -> bool {
        // Both products stay below 100 * 10^36, well inside u128.
        self.numerator * other.denominator == other.numerator * self.denominator
    }
}

impl Eq for Margin {}

impl Default for Margin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FromStr for Margin {
    type Err = PrimitiveError;

    /// Parse a decimal fraction (`"0.05"`) or a percentage (`"5%"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (digits, percent) = match trimmed.strip_suffix('%') {
            Some(rest) => (rest.trim(), true),
            None => (trimmed, false),
        };
        if digits.is_empty() {
            return Err(PrimitiveError::InvalidMargin(s.into()));
        }

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) || (int_part.is_empty() && frac_part.is_empty()) {
            return Err(PrimitiveError::InvalidMargin(s.into()));
        }
        if frac_part.len() > 16 {
            return Err(PrimitiveError::InvalidMargin(format!(
                "{}: too many fractional digits",
                s
            )));
        }

        let scale = 10u128.pow(frac_part.len() as u32);
        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| PrimitiveError::InvalidMargin(s.into()))?
        };
        let frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            frac_part
                .parse()
                .map_err(|_| PrimitiveError::InvalidMargin(s.into()))?
        };
        let numerator = int_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| PrimitiveError::InvalidMargin(s.into()))?;
        let denominator = if percent { scale * 100 } else { scale };
        Margin::new(numerator, denominator)
    }
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if MAX_DENOMINATOR % self.denominator != 0 {
            return write!(f, "{}/{}", self.numerator, self.denominator);
        }
        let scaled = self.numerator * (MAX_DENOMINATOR / self.denominator);
        let whole = scaled / MAX_DENOMINATOR;
        let frac = scaled % MAX_DENOMINATOR;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        let m: Margin = "0.05".parse().unwrap();
        assert_eq!(m.numerator(), 5);
        assert_eq!(m.denominator(), 100);
    }

    #[test]
    fn test_parse_percent() {
        let m: Margin = "5%".parse().unwrap();
        assert_eq!(m.apply_ceil(100), Some(105));
        let m: Margin = "2.5%".parse().unwrap();
        assert_eq!(m.apply_ceil(1000), Some(1025));
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert!("-0.05".parse::<Margin>().is_err());
        assert!("+0.05".parse::<Margin>().is_err());
        assert!("abc".parse::<Margin>().is_err());
        assert!("".parse::<Margin>().is_err());
        assert!(".".parse::<Margin>().is_err());
        assert!("1e3".parse::<Margin>().is_err());
    }

    #[test]
    fn test_equality_is_by_value() {
        let a: Margin = "0.05".parse().unwrap();
        let b: Margin = "0.0500".parse().unwrap();
        let c: Margin = "5%".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, Margin::from_percent(5));
        assert_ne!(a, Margin::from_percent(6));
    }

    #[test]
    fn test_parse_bare_fraction_forms() {
        assert_eq!(".5".parse::<Margin>().unwrap().apply_ceil(10), Some(15));
        assert_eq!("1".parse::<Margin>().unwrap().apply_ceil(10), Some(20));
    }

    #[test]
    fn test_zero_denominator_rejected() {
        assert!(Margin::new(1, 0).is_err());
    }

    #[test]
    fn test_ratio_cap() {
        assert!(Margin::new(101, 1).is_err());
        assert!(Margin::new(100, 1).is_ok());
    }

    #[test]
    fn test_apply_ceil_exact() {
        // 2_300_000 * 1.05 = 2_415_000 exactly.
        let m = Margin::from_percent(5);
        assert_eq!(m.apply_ceil(2_300_000), Some(2_415_000));
    }

    #[test]
    fn test_apply_ceil_rounds_up() {
        // 1 * 1.05 = 1.05 -> 2
        let m = Margin::from_percent(5);
        assert_eq!(m.apply_ceil(1), Some(2));
        // 21 * 1.05 = 22.05 -> 23
        assert_eq!(m.apply_ceil(21), Some(23));
    }

    #[test]
    fn test_apply_ceil_zero_margin_is_identity() {
        assert_eq!(Margin::ZERO.apply_ceil(0), Some(0));
        assert_eq!(Margin::ZERO.apply_ceil(u128::MAX), Some(u128::MAX));
    }

    #[test]
    fn test_apply_ceil_large_balance_no_precision_loss() {
        // 2^60 + 1 is not representable as f64; integer scaling stays exact.
        let value: u128 = (1u128 << 60) + 1;
        let m = Margin::from_percent(100);
        assert_eq!(m.apply_ceil(value), Some(2 * value));
    }

    #[test]
    fn test_apply_ceil_overflow_returns_none() {
        let m = Margin::from_percent(5);
        assert_eq!(m.apply_ceil(u128::MAX), None);
    }

    #[test]
    fn test_is_exceeded() {
        let m = Margin::from_percent(10);
        assert!(!m.is_exceeded(1000, 1100));
        assert!(m.is_exceeded(1000, 1101));
    }

    #[test]
    fn test_display() {
        assert_eq!(Margin::from_percent(5).to_string(), "0.05");
        assert_eq!(Margin::ZERO.to_string(), "0");
        assert_eq!(Margin::new(1, 3).unwrap().to_string(), "1/3");
        assert_eq!(Margin::from_percent(150).to_string(), "1.5");
    }
}
