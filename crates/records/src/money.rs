use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::RecordError;

/// Signed money amount represented as **integer cents**.
///
/// Every decimal column of the workbook ends up in this type, so the records
/// handed to persistence never carry floating-point values.
///
/// # Examples
///
/// ```rust
/// use records::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from text (accepts `.` or `,` as decimal separator; rejects more
/// than 2 decimals):
///
/// ```rust
/// use records::MoneyCents;
///
/// assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<MoneyCents>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Converts a major-unit amount (as stored in a numeric cell) into cents,
    /// rounding half away from zero.
    ///
    /// ```rust
    /// use records::MoneyCents;
    ///
    /// assert_eq!(MoneyCents::from_major(300.0).unwrap().cents(), 30_000);
    /// assert_eq!(MoneyCents::from_major(0.1 + 0.2).unwrap().cents(), 30);
    /// assert!(MoneyCents::from_major(f64::NAN).is_err());
    /// ```
    pub fn from_major(value: f64) -> Result<Self, RecordError> {
        if !value.is_finite() {
            return Err(RecordError::InvalidAmount(format!("{value} is not finite")));
        }
        let cents = (value * 100.0).round();
        // i64::MAX is not representable as f64, compare against 2^63.
        if cents >= 9_223_372_036_854_775_808.0 || cents < -9_223_372_036_854_775_808.0 {
            return Err(RecordError::InvalidAmount(format!("{value} is too large")));
        }
        Ok(Self(cents as i64))
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl FromStr for MoneyCents {
    type Err = RecordError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    /// Used for amounts typed as text in a numeric column.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || RecordError::InvalidAmount("empty amount".to_string());
        let invalid = || RecordError::InvalidAmount(format!("\"{s}\" is not an amount"));
        let overflow = || RecordError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let rest = rest.trim().replace(',', ".");
        if rest.is_empty() {
            return Err(empty());
        }

        let (units_str, frac_str) = match rest.split_once('.') {
            Some((units, frac)) => (units, frac),
            None => (rest.as_str(), ""),
        };

        if units_str.is_empty()
            || !units_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| overflow())?;
        let cents: i64 = match frac_str.len() {
            0 => 0,
            1 => frac_str.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => frac_str.parse::<i64>().map_err(|_| invalid())?,
            _ => return Err(RecordError::InvalidAmount("too many decimals".to_string())),
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        Ok(MoneyCents(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("-0.01".parse::<MoneyCents>().unwrap().cents(), -1);
        assert_eq!("+1.00".parse::<MoneyCents>().unwrap().cents(), 100);
        assert_eq!("  2.30 ".parse::<MoneyCents>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("12.345".parse::<MoneyCents>().is_err());
        assert!("abc".parse::<MoneyCents>().is_err());
        assert!("1.2.3".parse::<MoneyCents>().is_err());
        assert!("-".parse::<MoneyCents>().is_err());
    }

    #[test]
    fn from_major_rounds_to_nearest_cent() {
        assert_eq!(MoneyCents::from_major(12.346).unwrap().cents(), 1235);
        assert_eq!(MoneyCents::from_major(-0.005).unwrap().cents(), -1);
        assert_eq!(MoneyCents::from_major(1000.0).unwrap().cents(), 100_000);
    }

    #[test]
    fn from_major_rejects_out_of_range() {
        assert!(MoneyCents::from_major(f64::INFINITY).is_err());
        assert!(MoneyCents::from_major(1e300).is_err());
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&MoneyCents::new(30_000)).unwrap();
        assert_eq!(json, "30000");
    }
}
