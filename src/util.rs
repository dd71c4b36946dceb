// Utility helpers for parsing and number formatting.
//
// This module centralizes all the "dirty" CSV/number handling so the rest
// of the code can assume clean, typed values. Coercion functions report
// whether the zero fallback was used, so loaders can count fallbacks and
// tests can assert on them.
use num_format::{Locale, ToFormattedString};

/// Coerce a string-like cell into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
///
/// Returns the value plus a flag telling whether the documented fallback
/// (0.0) was substituted for an absent or unparsable cell.
pub fn coerce_f64(s: Option<&str>) -> (f64, bool) {
    let Some(s) = s else {
        return (0.0, true);
    };
    let s = s.trim();
    if s.is_empty() {
        return (0.0, true);
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return (0.0, true);
    }
    let cleaned = s.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(v) => (v, false),
        Err(_) => (0.0, true),
    }
}

/// Coerce a cell into a non-negative integer count.
///
/// Counts ride through the same lenient parse as `coerce_f64`; fractional
/// values are truncated and negative values fall back to 0 so the
/// "quantity is a non-negative integer" invariant holds at the boundary.
pub fn coerce_count(s: Option<&str>) -> (u32, bool) {
    let (v, fell_back) = coerce_f64(s);
    if fell_back || v < 0.0 {
        return (0, true);
    }
    (v as u32, false)
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `128 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_f64_parses_plain_and_separated_numbers() {
        assert_eq!(coerce_f64(Some("0.33")), (0.33, false));
        assert_eq!(coerce_f64(Some("1,234.5")), (1234.5, false));
        assert_eq!(coerce_f64(Some("  -7.5 ")), (-7.5, false));
    }

    #[test]
    fn coerce_f64_falls_back_to_zero() {
        assert_eq!(coerce_f64(None), (0.0, true));
        assert_eq!(coerce_f64(Some("")), (0.0, true));
        assert_eq!(coerce_f64(Some("n/a")), (0.0, true));
        assert_eq!(coerce_f64(Some("12x")), (0.0, true));
    }

    #[test]
    fn coerce_count_truncates_and_clamps() {
        assert_eq!(coerce_count(Some("5")), (5, false));
        assert_eq!(coerce_count(Some("3.7")), (3, false));
        assert_eq!(coerce_count(Some("-4")), (0, true));
        assert_eq!(coerce_count(Some("abc")), (0, true));
    }

    #[test]
    fn format_number_inserts_separators_and_keeps_sign() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 2), "-12.50");
        assert_eq!(format_number(0.0, 1), "0.0");
    }
}
