//! Fixed-point arithmetic for quantities, prices and shares.
//!
//! Asset quantities, prices and market caps carry 18 decimals ([`WAD`]);
//! share balances carry 6 ([`SHARE_UNIT`]). Every `a * b / c` goes through a
//! 256-bit intermediate and rounds toward zero.

use uint::construct_uint;

use super::error::FundError;

construct_uint! {
    pub struct U256(4);
}

pub const WAD_DECIMALS: u32 = 18;
pub const SHARE_DECIMALS: u32 = 6;

/// One whole unit of an asset, a price of 1.0, or a ratio of 1.0.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// One whole fund share.
pub const SHARE_UNIT: u128 = 1_000_000;

/// `floor(a * b / denominator)`.
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Result<u128, FundError> {
    if denominator == 0 {
        return Err(FundError::invalid_state(format!(
            "division by zero in {a} * {b} / 0"
        )));
    }
    let result = U256::from(a) * U256::from(b) / U256::from(denominator);
    if result > U256::from(u128::MAX) {
        return Err(FundError::invalid_state(format!(
            "{a} * {b} / {denominator} overflows u128"
        )));
    }
    Ok(result.as_u128())
}

/// Base-currency value of `quantity` units priced at `price` (both WAD-scaled).
pub fn value_of(quantity: u128, price: u128) -> Result<u128, FundError> {
    mul_div_floor(quantity, price, WAD)
}

/// WAD-scaled `part / whole`; zero when `whole` is zero.
pub fn ratio(part: u128, whole: u128) -> Result<u128, FundError> {
    if whole == 0 {
        return Ok(0);
    }
    mul_div_floor(part, WAD, whole)
}

/// Parse a decimal string such as `"1.5"`, `"0.25"` or `"1.5e12"` into an
/// integer scaled by `10^decimals`.
pub fn parse_decimal(input: &str, decimals: u32) -> Result<u128, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty number".to_string());
    }

    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(idx) => {
            let exp: u32 = s[idx + 1..]
                .parse()
                .map_err(|_| format!("invalid exponent in {s:?}"))?;
            (&s[..idx], exp)
        }
        None => (s, 0),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(format!("no digits in {s:?}"));
    }
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(format!("invalid number {s:?}"));
    }

    let mut digits = format!("{int_part}{frac_part}");
    let shift = i64::from(decimals) + i64::from(exponent) - frac_part.len() as i64;
    if shift < 0 {
        let keep = digits.len().saturating_sub(shift.unsigned_abs() as usize);
        if digits[keep..].bytes().any(|b| b != b'0') {
            return Err(format!("{s:?} has more than {decimals} decimal places"));
        }
        digits.truncate(keep);
    }

    let overflow = || format!("{s:?} is too large");
    let mut value: u128 = 0;
    for b in digits.bytes() {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u128::from(b - b'0')))
            .ok_or_else(overflow)?;
    }
    if shift > 0 {
        let scale = 10u128
            .checked_pow(u32::try_from(shift).map_err(|_| overflow())?)
            .ok_or_else(overflow)?;
        value = value.checked_mul(scale).ok_or_else(overflow)?;
    }
    Ok(value)
}

/// Render an integer scaled by `10^decimals` as a decimal string without
/// trailing zeros.
pub fn format_decimal(value: u128, decimals: u32) -> String {
    let unit = 10u128.pow(decimals);
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    format!("{whole}.{}", frac_str.trim_end_matches('0'))
}
