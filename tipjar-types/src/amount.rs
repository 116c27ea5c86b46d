//! Conversion between decimal display strings and integer base units.
//!
//! Amounts are `U256` base units everywhere except at the display edge.
//! Nothing in here goes through floating point.

use alloy::primitives::{
    Address, U256,
    utils::{ParseUnits, format_units, parse_units},
};

/// Decimals of ETH and every other native currency in the network catalog.
pub const ETHER_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("{0:?} is not a decimal number")]
    Malformed(String),

    #[error("{0:?} has more than {1} decimal places")]
    TooPrecise(String, u8),

    #[error("amount must be greater than zero")]
    NotPositive,
}

/// Parse a decimal string such as `"0.001"` into base units.
///
/// Zero and negative values are rejected, as is anything finer than one
/// base unit.
pub fn parse_amount(s: &str, decimals: u8) -> Result<U256, AmountError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    let numeric = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !numeric(int) || !numeric(frac) {
        return Err(AmountError::Malformed(s.to_string()));
    }
    if frac.len() > usize::from(decimals) {
        return Err(AmountError::TooPrecise(s.to_string(), decimals));
    }

    let int = if int.is_empty() { "0" } else { int };
    let normalized = if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    };

    let value = match parse_units(&normalized, decimals) {
        Ok(ParseUnits::U256(v)) => v,
        Ok(ParseUnits::I256(_)) => return Err(AmountError::NotPositive),
        Err(_) => return Err(AmountError::Malformed(s.to_string())),
    };

    if negative || value.is_zero() {
        return Err(AmountError::NotPositive);
    }

    Ok(value)
}

/// Render base units as a decimal string without trailing zeros.
pub fn format_amount(value: U256, decimals: u8) -> String {
    let Ok(s) = format_units(value, decimals) else {
        return value.to_string();
    };
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// `0x1234...abcd`
pub fn short_address(addr: &Address) -> String {
    let s = addr.to_string();
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}
