//! Number conversions: `Number::toString`, `ToNumber` on strings, and the
//! integer conversions used by bitwise operators.

/// Format a number the way `String(n)` does.
///
/// # Examples
///
/// ```
/// use core_types::number_to_string;
///
/// assert_eq!(number_to_string(42.0), "42");
/// assert_eq!(number_to_string(0.1), "0.1");
/// assert_eq!(number_to_string(1e21), "1e+21");
/// assert_eq!(number_to_string(-1.5e-7), "-1.5e-7");
/// ```
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value < 0.0 {
        return format!("-{}", number_to_string(-value));
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e4".
    let formatted = format!("{:e}", value);
    let (mantissa, exponent) = match formatted.split_once('e') {
        Some(parts) => parts,
        None => return formatted,
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((n - k) as usize));
        out
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let e = n - 1;
        let sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, e.abs())
        }
    }
}

/// Convert a string to a number following `ToNumber`.
///
/// Returns `NaN` for anything that is not a numeric literal.
pub fn string_to_number(input: &str) -> f64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let lower = trimmed.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            return u64::from_str_radix(rest, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }

    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// `ToInt32`: wrap a number into the signed 32-bit range.
pub fn to_int32(value: f64) -> i32 {
    to_uint32(value) as i32
}

/// `ToUint32`: wrap a number into the unsigned 32-bit range.
pub fn to_uint32(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let truncated = value.trunc();
    let modulo = truncated.rem_euclid(4_294_967_296.0);
    modulo as u32
}
