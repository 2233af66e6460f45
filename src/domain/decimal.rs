//! Decimal string algebra.
//!
//! Every price, amount and volume the broker sends is a fixed-point
//! decimal string. These helpers compare and combine such strings
//! with exact decimal semantics so nothing in the crate ever routes
//! money or unit math through binary floats.
//!
//! Only the operations the normalizers need are exposed: `add`,
//! `abs`, `gt`, `lt`, plus `negate` and `compare`.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Input contract violation: the string is not a decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("malformed numeric string: {0:?}")]
    Malformed(String),
}

/// Parse a numeric string into an exact decimal.
///
/// Accepts plain (`"-1.25"`) and scientific (`"1.5e-3"`) notation.
pub fn parse(value: &str) -> Result<Decimal, DecimalError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DecimalError::Malformed(value.to_string()));
    }
    Decimal::from_str_exact(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .or_else(|_| Decimal::from_str(trimmed))
        .map_err(|_| DecimalError::Malformed(value.to_string()))
}

/// Exact sum of two numeric strings.
pub fn add(a: &str, b: &str) -> Result<String, DecimalError> {
    let sum = parse(a)?
        .checked_add(parse(b)?)
        .ok_or_else(|| DecimalError::Malformed(format!("{a} + {b}")))?;
    Ok(sum.to_string())
}

/// Absolute value, keeping the input's scale (`"-5.00"` → `"5.00"`).
pub fn abs(a: &str) -> Result<String, DecimalError> {
    Ok(parse(a)?.abs().to_string())
}

/// Sign flip, keeping the input's scale.
pub fn negate(a: &str) -> Result<String, DecimalError> {
    let value = parse(a)?;
    if value.is_zero() {
        return Ok(value.abs().to_string());
    }
    Ok((-value).to_string())
}

/// Total order on decimal value. `"1.0"` and `"1"` compare equal.
pub fn compare(a: &str, b: &str) -> Result<Ordering, DecimalError> {
    Ok(parse(a)?.cmp(&parse(b)?))
}

/// `a > b` on decimal value.
pub fn gt(a: &str, b: &str) -> Result<bool, DecimalError> {
    Ok(compare(a, b)? == Ordering::Greater)
}

/// `a < b` on decimal value.
pub fn lt(a: &str, b: &str) -> Result<bool, DecimalError> {
    Ok(compare(a, b)? == Ordering::Less)
}

/// `a > 0`. Broker sign conventions (units, amounts) hinge on this.
pub fn is_positive(a: &str) -> Result<bool, DecimalError> {
    gt(a, "0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(parse("-1.25").unwrap(), dec!(-1.25));
        assert_eq!(parse(" 114.842 ").unwrap(), dec!(114.842));
        assert_eq!(parse("1.5e-3").unwrap(), dec!(0.0015));
    }

    #[test]
    fn test_equal_values_with_different_scale() {
        assert_eq!(compare("1.0", "1").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.29300", "1.293").unwrap(), Ordering::Equal);
        assert!(!gt("1.0", "1").unwrap());
        assert!(!lt("1.0", "1").unwrap());
    }

    #[test]
    fn test_comparison_beyond_float_precision() {
        // Adjacent at the 20th decimal place; f64 cannot tell them apart.
        assert!(lt("0.10000000000000000001", "0.10000000000000000002").unwrap());
        assert!(gt("114.824", "114.8239999999").unwrap());
    }

    #[test]
    fn test_add_is_exact() {
        assert_eq!(add("0.1", "0.2").unwrap(), "0.3");
        assert_eq!(add("0.0063", "0.0000").unwrap(), "0.0063");
        assert_eq!(add("-5", "3").unwrap(), "-2");
    }

    #[test]
    fn test_abs_and_negate() {
        assert_eq!(abs("-5").unwrap(), "5");
        assert_eq!(abs("3").unwrap(), "3");
        assert_eq!(abs("-0.0023").unwrap(), "0.0023");
        assert_eq!(negate("5").unwrap(), "-5");
        assert_eq!(negate("-1.50").unwrap(), "1.50");
        assert_eq!(negate("0").unwrap(), "0");
    }

    #[test]
    fn test_scientific_notation_accepted() {
        assert_eq!(compare("1.5e-3", "0.0015").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert_eq!(
            add("1.2.3", "1"),
            Err(DecimalError::Malformed("1.2.3".to_string()))
        );
        assert!(gt("abc", "1").is_err());
        assert!(abs("").is_err());
    }

    #[test]
    fn test_sign_helper() {
        assert!(is_positive("1").unwrap());
        assert!(!is_positive("0").unwrap());
        assert!(!is_positive("-0.5").unwrap());
    }
}
