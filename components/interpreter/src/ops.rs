//! Operator semantics.
//!
//! Binary and unary operators over [`Value`], following the language's
//! coercion rules for numbers, strings, bigints, booleans and nullish
//! values.

use core_types::{to_int32, to_uint32, JsError, JsResult, PreferredType, Value};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

/// Numeric operand after `ToNumeric`.
enum Numeric {
    Number(f64),
    BigInt(BigInt),
}

fn to_numeric(value: &Value) -> JsResult<Numeric> {
    match value.to_primitive(PreferredType::Number)? {
        Value::BigInt(n) => Ok(Numeric::BigInt(n)),
        other => Ok(Numeric::Number(other.to_number())),
    }
}

/// `ToNumber` that runs `valueOf`/`toString` on objects and rejects bigints.
pub fn to_number(value: &Value) -> JsResult<f64> {
    match to_numeric(value)? {
        Numeric::Number(n) => Ok(n),
        Numeric::BigInt(_) => Err(JsError::type_error(
            "Cannot convert a BigInt value to a number",
        )),
    }
}

fn mixed_types() -> JsError {
    JsError::type_error("Cannot mix BigInt and other types, use explicit conversions")
}

fn shift_amount(n: &BigInt) -> JsResult<usize> {
    n.to_usize()
        .ok_or_else(|| JsError::range_error("Maximum BigInt size exceeded"))
}

/// Apply a binary operator. `&&`, `||` and `??` are handled by the caller
/// because they short-circuit.
pub fn binary(operator: &str, left: &Value, right: &Value) -> JsResult<Value> {
    match operator {
        "+" => add(left, right),
        "==" => Ok(Value::Boolean(left.loose_equals(right))),
        "!=" => Ok(Value::Boolean(!left.loose_equals(right))),
        "===" => Ok(Value::Boolean(left.strict_equals(right))),
        "!==" => Ok(Value::Boolean(!left.strict_equals(right))),
        "<" => Ok(Value::Boolean(compare(left, right, true)? == Some(true))),
        ">" => Ok(Value::Boolean(compare(right, left, false)? == Some(true))),
        "<=" => Ok(Value::Boolean(compare(right, left, false)? == Some(false))),
        ">=" => Ok(Value::Boolean(compare(left, right, true)? == Some(false))),
        "in" => {
            let key = left.to_primitive(PreferredType::String)?.to_property_key();
            Ok(Value::Boolean(builtins::has_property(right, &key)?))
        }
        "instanceof" => Ok(Value::Boolean(builtins::instance_of(left, right)?)),
        _ => arithmetic(operator, left, right),
    }
}

fn add(left: &Value, right: &Value) -> JsResult<Value> {
    let left = left.to_primitive(PreferredType::Default)?;
    let right = right.to_primitive(PreferredType::Default)?;
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(Value::String(format!("{}{}", left, right)));
    }
    arithmetic("+", &left, &right)
}

fn arithmetic(operator: &str, left: &Value, right: &Value) -> JsResult<Value> {
    match (to_numeric(left)?, to_numeric(right)?) {
        (Numeric::Number(a), Numeric::Number(b)) => number_op(operator, a, b),
        (Numeric::BigInt(a), Numeric::BigInt(b)) => bigint_op(operator, a, b),
        _ => Err(mixed_types()),
    }
}

fn number_op(operator: &str, a: f64, b: f64) -> JsResult<Value> {
    let result = match operator {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => a / b,
        "%" => a % b,
        "**" => {
            if b.is_nan() || (a.abs() == 1.0 && b.is_infinite()) {
                f64::NAN
            } else {
                a.powf(b)
            }
        }
        "&" => (to_int32(a) & to_int32(b)) as f64,
        "|" => (to_int32(a) | to_int32(b)) as f64,
        "^" => (to_int32(a) ^ to_int32(b)) as f64,
        "<<" => to_int32(a).wrapping_shl(to_uint32(b) & 31) as f64,
        ">>" => to_int32(a).wrapping_shr(to_uint32(b) & 31) as f64,
        ">>>" => to_uint32(a).wrapping_shr(to_uint32(b) & 31) as f64,
        other => {
            return Err(JsError::eval(
                core_types::ErrorKind::InternalError,
                format!("unknown binary operator '{}'", other),
            ))
        }
    };
    Ok(Value::Number(result))
}

fn bigint_op(operator: &str, a: BigInt, b: BigInt) -> JsResult<Value> {
    let result = match operator {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" | "%" if b.is_zero() => return Err(JsError::range_error("Division by zero")),
        "/" => a / b,
        "%" => a % b,
        "**" => {
            if b < BigInt::zero() {
                return Err(JsError::range_error("Exponent must be non-negative"));
            }
            let exponent = b
                .to_u32()
                .ok_or_else(|| JsError::range_error("Maximum BigInt size exceeded"))?;
            num_traits::pow::Pow::pow(a, exponent)
        }
        "&" => a & b,
        "|" => a | b,
        "^" => a ^ b,
        "<<" => {
            if b < BigInt::zero() {
                a >> shift_amount(&-b)?
            } else {
                a << shift_amount(&b)?
            }
        }
        ">>" => {
            if b < BigInt::zero() {
                a << shift_amount(&-b)?
            } else {
                a >> shift_amount(&b)?
            }
        }
        ">>>" => {
            return Err(JsError::type_error(
                "BigInts have no unsigned right shift, use >> instead",
            ))
        }
        other => {
            return Err(JsError::eval(
                core_types::ErrorKind::InternalError,
                format!("unknown binary operator '{}'", other),
            ))
        }
    };
    Ok(Value::BigInt(result))
}

/// Abstract relational comparison `left < right`.
///
/// Returns `None` when either side is `NaN`. `left_first` is false when
/// the operands were swapped (`>` and `<=`), so conversion still follows
/// source order.
fn compare(left: &Value, right: &Value, left_first: bool) -> JsResult<Option<bool>> {
    let (left, right) = if left_first {
        let l = left.to_primitive(PreferredType::Number)?;
        (l, right.to_primitive(PreferredType::Number)?)
    } else {
        let r = right.to_primitive(PreferredType::Number)?;
        (left.to_primitive(PreferredType::Number)?, r)
    };
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Ok(Some(a < b));
    }
    Ok(match (&left, &right) {
        (Value::BigInt(a), Value::BigInt(b)) => Some(a < b),
        (Value::BigInt(a), Value::String(s)) => s.trim().parse::<BigInt>().ok().map(|b| *a < b),
        (Value::String(s), Value::BigInt(b)) => s.trim().parse::<BigInt>().ok().map(|a| a < *b),
        (Value::BigInt(a), other) => compare_bigint_number(a, other.to_number(), false),
        (other, Value::BigInt(b)) => compare_bigint_number(b, other.to_number(), true),
        (a, b) => {
            let (a, b) = (a.to_number(), b.to_number());
            if a.is_nan() || b.is_nan() {
                None
            } else {
                Some(a < b)
            }
        }
    })
}

fn compare_bigint_number(big: &BigInt, n: f64, reversed: bool) -> Option<bool> {
    if n.is_nan() {
        return None;
    }
    let big = big.to_f64().unwrap_or(f64::NAN);
    Some(if reversed { n < big } else { big < n })
}

/// Apply a prefix operator other than `delete`, `typeof` and `await`.
pub fn unary(operator: &str, value: &Value) -> JsResult<Value> {
    match operator {
        "!" => Ok(Value::Boolean(!value.is_truthy())),
        "void" => Ok(Value::Undefined),
        "typeof" => Ok(Value::from(value.type_of())),
        "+" => Ok(Value::Number(to_number(value)?)),
        "-" => Ok(match to_numeric(value)? {
            Numeric::Number(n) => Value::Number(-n),
            Numeric::BigInt(n) => Value::BigInt(-n),
        }),
        "~" => Ok(match to_numeric(value)? {
            Numeric::Number(n) => Value::Number(!to_int32(n) as f64),
            Numeric::BigInt(n) => Value::BigInt(-(n + BigInt::from(1))),
        }),
        other => Err(JsError::eval(
            core_types::ErrorKind::InternalError,
            format!("unknown unary operator '{}'", other),
        )),
    }
}

/// `value + 1` or `value - 1` for `++`/`--`, returning the old numeric
/// value and the new one.
pub fn increment(value: &Value, delta: i8) -> JsResult<(Value, Value)> {
    match to_numeric(value)? {
        Numeric::Number(n) => Ok((Value::Number(n), Value::Number(n + delta as f64))),
        Numeric::BigInt(n) => {
            let next = &n + BigInt::from(delta);
            Ok((Value::BigInt(n), Value::BigInt(next)))
        }
    }
}
