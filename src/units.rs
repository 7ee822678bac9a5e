//! Conversions between decimal unit strings and wei.

use thiserror::Error;

use crate::types::{Wei, WEI_PER_UNIT};

/// Decimal places of one unit
pub const UNIT_DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("Empty amount")]
    Empty,

    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Too many decimal places in {0} (max 18)")]
    TooPrecise(String),

    #[error("Amount overflows: {0}")]
    Overflow(String),
}

/// Whole units to wei
pub const fn units(whole: u64) -> Wei {
    whole as Wei * WEI_PER_UNIT
}

/// Thousandths of a unit to wei
pub const fn milli_units(milli: u64) -> Wei {
    milli as Wei * (WEI_PER_UNIT / 1_000)
}

/// Parse a decimal amount of units such as `"10"`, `"0.7"` or `"1.05"` into wei.
pub fn parse_units(input: &str) -> Result<Wei, AmountParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountParseError::Empty);
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(AmountParseError::Invalid(input.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountParseError::Invalid(input.to_string()));
    }
    if frac.len() > UNIT_DECIMALS {
        return Err(AmountParseError::TooPrecise(input.to_string()));
    }

    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<Wei>()
            .ok()
            .and_then(|w| w.checked_mul(WEI_PER_UNIT))
            .ok_or_else(|| AmountParseError::Overflow(input.to_string()))?
    };

    let frac_wei = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = UNIT_DECIMALS);
        padded
            .parse::<Wei>()
            .map_err(|_| AmountParseError::Invalid(input.to_string()))?
    };

    whole_wei
        .checked_add(frac_wei)
        .ok_or_else(|| AmountParseError::Overflow(input.to_string()))
}

/// Render wei as a decimal amount of units, without trailing zeros.
pub fn format_units(amount: Wei) -> String {
    let whole = amount / WEI_PER_UNIT;
    let frac = amount % WEI_PER_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = UNIT_DECIMALS);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Serde adapter storing wei amounts as decimal unit strings.
///
/// TOML integers are i64 and cannot hold 10 units in wei.
pub mod serde_units {
    use super::{format_units, parse_units};
    use crate::types::Wei;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &Wei, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_units(*amount))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Wei, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_units(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional_units() {
        assert_eq!(parse_units("10").unwrap(), units(10));
        assert_eq!(parse_units("0.7").unwrap(), milli_units(700));
        assert_eq!(parse_units("1.05").unwrap(), milli_units(1050));
        assert_eq!(parse_units(".5").unwrap(), milli_units(500));
        assert_eq!(parse_units("0.000000000000000001").unwrap(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_units(""), Err(AmountParseError::Empty));
        assert!(matches!(parse_units("1.2.3"), Err(AmountParseError::Invalid(_))));
        assert!(matches!(parse_units("-1"), Err(AmountParseError::Invalid(_))));
        assert!(matches!(parse_units("."), Err(AmountParseError::Invalid(_))));
        assert!(matches!(
            parse_units("0.0000000000000000001"),
            Err(AmountParseError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(units(15)), "15");
        assert_eq!(format_units(milli_units(1050)), "1.05");
        assert_eq!(format_units(milli_units(700)), "0.7");
        assert_eq!(format_units(0), "0");
    }
}
