//! Number constructor, Number.prototype methods and the global numeric
//! parsing functions.

use core_types::{arg, number_to_string, JsError, JsResult, NativeFunction, Value};
use num_bigint::BigInt;
use std::rc::Rc;

/// Number constructor with static methods
pub struct NumberConstructor;

impl NumberConstructor {
    /// Number.MAX_SAFE_INTEGER
    pub const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;
    /// Number.MIN_SAFE_INTEGER
    pub const MIN_SAFE_INTEGER: f64 = -9007199254740991.0;

    /// Number.isInteger(value)
    pub fn is_integer(value: f64) -> bool {
        value.is_finite() && value.trunc() == value
    }

    /// Number.isSafeInteger(value)
    pub fn is_safe_integer(value: f64) -> bool {
        Self::is_integer(value) && value.abs() <= Self::MAX_SAFE_INTEGER
    }

    /// parseInt(string, radix)
    pub fn parse_int(s: &str, radix: Option<u32>) -> f64 {
        let s = s.trim();
        let (negative, s) = if let Some(rest) = s.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = s.strip_prefix('+') {
            (false, rest)
        } else {
            (false, s)
        };

        let (radix, s) = match radix {
            None | Some(0) => match s.get(..2) {
                Some("0x") | Some("0X") => (16, &s[2..]),
                _ => (10, s),
            },
            Some(16) => match s.get(..2) {
                Some("0x") | Some("0X") => (16, &s[2..]),
                _ => (16, s),
            },
            Some(r) => (r, s),
        };
        if !(2..=36).contains(&radix) {
            return f64::NAN;
        }

        let mut value = 0.0;
        let mut found_digit = false;
        for c in s.chars() {
            match c.to_digit(radix) {
                Some(d) => {
                    value = value * radix as f64 + d as f64;
                    found_digit = true;
                }
                None => break,
            }
        }
        match (found_digit, negative) {
            (false, _) => f64::NAN,
            (true, true) => -value,
            (true, false) => value,
        }
    }

    /// parseFloat(string): parses the longest numeric prefix.
    pub fn parse_float(s: &str) -> f64 {
        let s = s.trim_start();
        for special in ["Infinity", "+Infinity"] {
            if s.starts_with(special) {
                return f64::INFINITY;
            }
        }
        if s.starts_with("-Infinity") {
            return f64::NEG_INFINITY;
        }

        let bytes = s.as_bytes();
        let mut end = 0;
        if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
            end += 1;
        }
        let mut seen_digit = false;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
                seen_digit = true;
            }
        }
        if !seen_digit {
            return f64::NAN;
        }
        if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
            let mut exp_end = end + 1;
            if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
                exp_end += 1;
            }
            let digits_start = exp_end;
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            if exp_end > digits_start {
                end = exp_end;
            }
        }
        s[..end].parse::<f64>().unwrap_or(f64::NAN)
    }

    /// The `Number` constructor value with its statics.
    pub fn constructor() -> Value {
        let number = NativeFunction::new("Number", |_, args| Ok(Value::Number(to_numeric(&args))))
            .with_constructor(|args| Ok(Value::Number(to_numeric(&args))))
            .with_static("MAX_SAFE_INTEGER", Value::Number(Self::MAX_SAFE_INTEGER))
            .with_static("MIN_SAFE_INTEGER", Value::Number(Self::MIN_SAFE_INTEGER))
            .with_static("MAX_VALUE", Value::Number(f64::MAX))
            .with_static("MIN_VALUE", Value::Number(5e-324))
            .with_static("EPSILON", Value::Number(f64::EPSILON))
            .with_static("POSITIVE_INFINITY", Value::Number(f64::INFINITY))
            .with_static("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY))
            .with_static("NaN", Value::Number(f64::NAN))
            .with_static(
                "isInteger",
                NativeFunction::value("isInteger", |_, args| {
                    Ok(Value::Boolean(
                        matches!(arg(&args, 0), Value::Number(n) if Self::is_integer(n)),
                    ))
                }),
            )
            .with_static(
                "isSafeInteger",
                NativeFunction::value("isSafeInteger", |_, args| {
                    Ok(Value::Boolean(
                        matches!(arg(&args, 0), Value::Number(n) if Self::is_safe_integer(n)),
                    ))
                }),
            )
            .with_static(
                "isFinite",
                NativeFunction::value("isFinite", |_, args| {
                    Ok(Value::Boolean(
                        matches!(arg(&args, 0), Value::Number(n) if n.is_finite()),
                    ))
                }),
            )
            .with_static(
                "isNaN",
                NativeFunction::value("isNaN", |_, args| {
                    Ok(Value::Boolean(
                        matches!(arg(&args, 0), Value::Number(n) if n.is_nan()),
                    ))
                }),
            )
            .with_static("parseFloat", parse_float_function())
            .with_static("parseInt", parse_int_function());
        Value::Function(Rc::new(number))
    }
}

fn to_numeric(args: &[Value]) -> f64 {
    match args.first() {
        None => 0.0,
        Some(value) => value.to_number(),
    }
}

/// The global `parseInt` function.
pub fn parse_int_function() -> Value {
    NativeFunction::value("parseInt", |_, args| {
        let radix = match arg(&args, 1) {
            Value::Undefined => None,
            other => Some(other.to_int32().max(0) as u32),
        };
        Ok(Value::Number(NumberConstructor::parse_int(
            &arg(&args, 0).to_string(),
            radix,
        )))
    })
}

/// The global `parseFloat` function.
pub fn parse_float_function() -> Value {
    NativeFunction::value("parseFloat", |_, args| {
        Ok(Value::Number(NumberConstructor::parse_float(
            &arg(&args, 0).to_string(),
        )))
    })
}

/// The global `BigInt` conversion function.
pub fn bigint_function() -> Value {
    NativeFunction::value("BigInt", |_, args| match arg(&args, 0) {
        Value::BigInt(n) => Ok(Value::BigInt(n)),
        Value::Number(n) if NumberConstructor::is_integer(n) => {
            Ok(Value::BigInt(BigInt::from(n as i64)))
        }
        Value::Number(n) => Err(JsError::range_error(format!(
            "The number {} cannot be converted to a BigInt because it is not an integer",
            number_to_string(n)
        ))),
        Value::Boolean(b) => Ok(Value::BigInt(BigInt::from(b as i64))),
        Value::String(s) => s
            .trim()
            .parse::<BigInt>()
            .map(Value::BigInt)
            .map_err(|_| {
                JsError::Throw(Value::new_error(
                    "SyntaxError",
                    format!("Cannot convert {} to a BigInt", s),
                ))
            }),
        other => Err(JsError::type_error(format!("Cannot convert {} to a BigInt", other))),
    })
}

/// Number.prototype methods
pub struct NumberPrototype;

impl NumberPrototype {
    /// Number.prototype.toString(radix)
    pub fn to_string(num: f64, radix: u32) -> JsResult<String> {
        if !(2..=36).contains(&radix) {
            return Err(JsError::range_error("toString() radix must be between 2 and 36"));
        }
        if radix == 10 || !num.is_finite() {
            return Ok(number_to_string(num));
        }

        let negative = num < 0.0;
        let mut int_part = num.abs().trunc();
        let mut frac_part = num.abs() - int_part;
        let mut digits = Vec::new();
        if int_part == 0.0 {
            digits.push('0');
        }
        while int_part >= 1.0 {
            let digit = (int_part % radix as f64) as u32;
            digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            int_part = (int_part / radix as f64).trunc();
        }
        digits.reverse();
        let mut result: String = digits.into_iter().collect();
        if frac_part > 0.0 {
            result.push('.');
            let mut count = 0;
            while frac_part > 0.0 && count < 52 {
                frac_part *= radix as f64;
                let digit = frac_part.trunc() as u32;
                result.push(std::char::from_digit(digit, radix).unwrap_or('0'));
                frac_part -= digit as f64;
                count += 1;
            }
        }
        if negative {
            result.insert(0, '-');
        }
        Ok(result)
    }

    /// Number.prototype.toFixed(digits)
    pub fn to_fixed(num: f64, digits: u32) -> JsResult<String> {
        if digits > 100 {
            return Err(JsError::range_error(
                "toFixed() digits argument must be between 0 and 100",
            ));
        }
        if !num.is_finite() || num.abs() >= 1e21 {
            return Ok(number_to_string(num));
        }
        Ok(format!("{:.prec$}", num, prec = digits as usize))
    }

    /// Number.prototype.toPrecision(precision)
    pub fn to_precision(num: f64, precision: u32) -> JsResult<String> {
        if !(1..=100).contains(&precision) {
            return Err(JsError::range_error(
                "toPrecision() argument must be between 1 and 100",
            ));
        }
        if !num.is_finite() {
            return Ok(number_to_string(num));
        }
        if num == 0.0 {
            return Ok(if precision == 1 {
                "0".to_string()
            } else {
                format!("0.{}", "0".repeat(precision as usize - 1))
            });
        }
        let exponent = num.abs().log10().floor() as i32;
        if exponent < -6 || exponent >= precision as i32 {
            let formatted = format!("{:.prec$e}", num, prec = precision as usize - 1);
            return Ok(match formatted.split_once('e') {
                Some((mantissa, exp)) if exp.starts_with('-') => format!("{}e{}", mantissa, exp),
                Some((mantissa, exp)) => format!("{}e+{}", mantissa, exp),
                None => formatted,
            });
        }
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        Ok(format!("{:.prec$}", num, prec = decimals))
    }

    /// Look up a Number.prototype method by name.
    pub fn method(name: &str) -> Option<Value> {
        let f = match name {
            "toString" => NativeFunction::value(name, |this, args| {
                let radix = match arg(&args, 0) {
                    Value::Undefined => 10,
                    other => other.to_number() as u32,
                };
                Ok(Value::String(Self::to_string(this.to_number(), radix)?))
            }),
            "toFixed" => NativeFunction::value(name, |this, args| {
                let digits = arg(&args, 0).to_number();
                let digits = if digits.is_nan() { 0 } else { digits.max(0.0) as u32 };
                Ok(Value::String(Self::to_fixed(this.to_number(), digits)?))
            }),
            "toPrecision" => NativeFunction::value(name, |this, args| match arg(&args, 0) {
                Value::Undefined => Ok(Value::String(number_to_string(this.to_number()))),
                p => Ok(Value::String(Self::to_precision(
                    this.to_number(),
                    p.to_number().max(0.0) as u32,
                )?)),
            }),
            "valueOf" => NativeFunction::value(name, |this, _| Ok(Value::Number(this.to_number()))),
            _ => return None,
        };
        Some(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(NumberConstructor::parse_int("42px", None), 42.0);
        assert_eq!(NumberConstructor::parse_int("0x1f", None), 31.0);
        assert_eq!(NumberConstructor::parse_int("-101", Some(2)), -5.0);
        assert!(NumberConstructor::parse_int("abc", None).is_nan());
        assert!(NumberConstructor::parse_int("1", Some(40)).is_nan());
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(NumberConstructor::parse_float("3.14abc"), 3.14);
        assert_eq!(NumberConstructor::parse_float("  -2.5e3x"), -2500.0);
        assert_eq!(NumberConstructor::parse_float("1e"), 1.0);
        assert!(NumberConstructor::parse_float(".").is_nan());
    }

    #[test]
    fn test_to_string_radix() {
        assert_eq!(NumberPrototype::to_string(255.0, 16).unwrap(), "ff");
        assert_eq!(NumberPrototype::to_string(-5.0, 2).unwrap(), "-101");
        assert_eq!(NumberPrototype::to_string(0.5, 2).unwrap(), "0.1");
        assert!(NumberPrototype::to_string(1.0, 1).is_err());
    }

    #[test]
    fn test_to_fixed_and_precision() {
        assert_eq!(NumberPrototype::to_fixed(3.14159, 2).unwrap(), "3.14");
        assert_eq!(NumberPrototype::to_precision(123.456, 4).unwrap(), "123.5");
        assert_eq!(NumberPrototype::to_precision(0.000123, 2).unwrap(), "0.00012");
        assert_eq!(NumberPrototype::to_precision(123456.0, 2).unwrap(), "1.2e+5");
    }
}
