use crate::error::{PrimitivesError, Result};

/// Number of decimal places between NEAR and yoctoNEAR.
pub const NEAR_NOMINATION_EXP: usize = 24;

/// 1 NEAR in yoctoNEAR.
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// Fractional digits shown when a balance is rendered for display. Full precision,
/// so dust stays visible and a balance just short of a value never rounds up to it.
pub const DEFAULT_DISPLAY_DECIMALS: usize = NEAR_NOMINATION_EXP;

/// Parse a human-entered decimal NEAR amount ("10", "0.25", "1,000.5") into yoctoNEAR.
///
/// Exact integer arithmetic, no floating point. More than 24 fractional digits,
/// a second decimal point, or any non-digit character is rejected.
pub fn parse_near_amount(amount: &str) -> Result<u128> {
    let invalid = || PrimitivesError::InvalidAmount(amount.to_string());

    let cleaned: String = amount.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(invalid());
    }

    let mut parts = cleaned.split('.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    if parts.next().is_some() || fraction.len() > NEAR_NOMINATION_EXP {
        return Err(invalid());
    }
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let digits = format!("{}{:0<width$}", whole, fraction, width = NEAR_NOMINATION_EXP);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u128>().map_err(|_| invalid())
}

/// Render yoctoNEAR as a decimal NEAR string with at most `frac_digits` fractional digits.
///
/// Rounds half-up at the cut-off, groups the whole part with commas and drops
/// trailing zeros (and a dangling decimal point).
pub fn format_near_amount(yocto: u128, frac_digits: usize) -> String {
    let frac_digits = frac_digits.min(NEAR_NOMINATION_EXP);

    let mut value = yocto;
    if frac_digits < NEAR_NOMINATION_EXP {
        let rounding_exp = (NEAR_NOMINATION_EXP - frac_digits - 1) as u32;
        value = value.saturating_add(5 * 10u128.pow(rounding_exp));
    }

    let whole = value / ONE_NEAR;
    let fraction = format!("{:0width$}", value % ONE_NEAR, width = NEAR_NOMINATION_EXP);
    let formatted = format!("{}.{}", with_commas(whole), &fraction[..frac_digits]);

    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn with_commas(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fraction() {
        assert_eq!(parse_near_amount("10").unwrap(), 10 * ONE_NEAR);
        assert_eq!(parse_near_amount("10.0").unwrap(), 10 * ONE_NEAR);
        assert_eq!(parse_near_amount("0.5").unwrap(), ONE_NEAR / 2);
        assert_eq!(parse_near_amount(".5").unwrap(), ONE_NEAR / 2);
        assert_eq!(parse_near_amount("1,000").unwrap(), 1000 * ONE_NEAR);
        assert_eq!(parse_near_amount(" 2 ").unwrap(), 2 * ONE_NEAR);
        assert_eq!(parse_near_amount("0.000000000000000000000001").unwrap(), 1);
        assert_eq!(parse_near_amount("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in [
            "",
            ".",
            "1.2.3",
            "abc",
            "-1",
            "1e3",
            "0.0000000000000000000000001",
            "999999999999999999999999999999",
        ] {
            assert!(parse_near_amount(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_format_trims_and_groups() {
        assert_eq!(format_near_amount(90 * ONE_NEAR, DEFAULT_DISPLAY_DECIMALS), "90");
        assert_eq!(format_near_amount(ONE_NEAR / 4, DEFAULT_DISPLAY_DECIMALS), "0.25");
        assert_eq!(format_near_amount(1_234_567 * ONE_NEAR, 2), "1,234,567");
        assert_eq!(format_near_amount(0, DEFAULT_DISPLAY_DECIMALS), "0");
        assert_eq!(format_near_amount(1, NEAR_NOMINATION_EXP), "0.000000000000000000000001");
    }

    #[test]
    fn test_format_rounds_half_up() {
        // 0.123456 -> 0.12346 at five digits
        let value = parse_near_amount("0.123456").unwrap();
        assert_eq!(format_near_amount(value, 5), "0.12346");
        // 0.999996 rolls over into the whole part
        let value = parse_near_amount("0.999996").unwrap();
        assert_eq!(format_near_amount(value, 5), "1");
    }

    #[test]
    fn test_default_precision_keeps_dust() {
        assert_eq!(format_near_amount(ONE_NEAR + 1, DEFAULT_DISPLAY_DECIMALS), "1.000000000000000000000001");
        // One yocto short of 10 NEAR must not display as 10.
        assert_eq!(
            format_near_amount(10 * ONE_NEAR - 1, DEFAULT_DISPLAY_DECIMALS),
            "9.999999999999999999999999"
        );
    }

    #[test]
    fn test_parse_then_format() {
        let value = parse_near_amount("1,000.75").unwrap();
        assert_eq!(format_near_amount(value, DEFAULT_DISPLAY_DECIMALS), "1,000.75");
    }
}
