//! The `Math` namespace object.

use core_types::{arg, JsObject, NativeFunction, Value};
use std::cell::Cell;
use std::f64::consts;

thread_local! {
    static RANDOM_STATE: Cell<u64> = Cell::new(seed());
}

fn seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x2545_f491_4f6c_dd1d);
    nanos | 1
}

/// Math object with static methods
pub struct MathObject;

impl MathObject {
    /// Math.PI
    pub const PI: f64 = consts::PI;
    /// Math.E
    pub const E: f64 = consts::E;

    /// Math.round(x): halves round towards positive infinity.
    pub fn round(x: f64) -> f64 {
        if !x.is_finite() || x.fract() == 0.0 {
            return x;
        }
        (x + 0.5).floor()
    }

    /// Math.sign(x)
    pub fn sign(x: f64) -> f64 {
        if x.is_nan() || x == 0.0 {
            x
        } else {
            x.signum()
        }
    }

    /// Math.random(): xorshift64 seeded from the clock.
    pub fn random() -> f64 {
        RANDOM_STATE.with(|state| {
            let mut x = state.get();
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            state.set(x);
            (x >> 11) as f64 / (1u64 << 53) as f64
        })
    }

    /// Math.max(...values)
    pub fn max(values: &[f64]) -> f64 {
        let mut result = f64::NEG_INFINITY;
        for &v in values {
            if v.is_nan() {
                return f64::NAN;
            }
            if v > result {
                result = v;
            }
        }
        result
    }

    /// Math.min(...values)
    pub fn min(values: &[f64]) -> f64 {
        let mut result = f64::INFINITY;
        for &v in values {
            if v.is_nan() {
                return f64::NAN;
            }
            if v < result {
                result = v;
            }
        }
        result
    }

    /// Math.hypot(...values)
    pub fn hypot(values: &[f64]) -> f64 {
        values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Build the `Math` object.
    pub fn object() -> Value {
        let mut math = JsObject::new();
        math.class_name = Some("Math".to_string());

        let constants = [
            ("PI", consts::PI),
            ("E", consts::E),
            ("LN2", consts::LN_2),
            ("LN10", consts::LN_10),
            ("LOG2E", consts::LOG2_E),
            ("LOG10E", consts::LOG10_E),
            ("SQRT2", consts::SQRT_2),
            ("SQRT1_2", consts::FRAC_1_SQRT_2),
        ];
        for (name, value) in constants {
            math.insert(name, Value::Number(value));
        }

        let unary: [(&str, fn(f64) -> f64); 21] = [
            ("abs", f64::abs),
            ("ceil", f64::ceil),
            ("floor", f64::floor),
            ("round", Self::round),
            ("trunc", f64::trunc),
            ("sign", Self::sign),
            ("sqrt", f64::sqrt),
            ("cbrt", f64::cbrt),
            ("sin", f64::sin),
            ("cos", f64::cos),
            ("tan", f64::tan),
            ("asin", f64::asin),
            ("acos", f64::acos),
            ("atan", f64::atan),
            ("log", f64::ln),
            ("log2", f64::log2),
            ("log10", f64::log10),
            ("log1p", f64::ln_1p),
            ("exp", f64::exp),
            ("expm1", f64::exp_m1),
            ("fround", |x| x as f32 as f64),
        ];
        for (name, f) in unary {
            math.insert(
                name,
                NativeFunction::value(name, move |_, args| {
                    Ok(Value::Number(f(arg(&args, 0).to_number())))
                }),
            );
        }

        let variadic: [(&str, fn(&[f64]) -> f64); 3] =
            [("max", Self::max), ("min", Self::min), ("hypot", Self::hypot)];
        for (name, f) in variadic {
            math.insert(
                name,
                NativeFunction::value(name, move |_, args| {
                    let numbers: Vec<f64> = args.iter().map(Value::to_number).collect();
                    Ok(Value::Number(f(&numbers)))
                }),
            );
        }

        math.insert(
            "pow",
            NativeFunction::value("pow", |_, args| {
                Ok(Value::Number(
                    arg(&args, 0).to_number().powf(arg(&args, 1).to_number()),
                ))
            }),
        );
        math.insert(
            "atan2",
            NativeFunction::value("atan2", |_, args| {
                Ok(Value::Number(
                    arg(&args, 0).to_number().atan2(arg(&args, 1).to_number()),
                ))
            }),
        );
        math.insert(
            "random",
            NativeFunction::value("random", |_, _| Ok(Value::Number(Self::random()))),
        );

        Value::Object(math.into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> f64 {
        let math = MathObject::object();
        let f = math.get_property(name);
        f.call(Value::Undefined, args).unwrap().to_number()
    }

    #[test]
    fn test_round() {
        assert_eq!(MathObject::round(1.4), 1.0);
        assert_eq!(MathObject::round(1.5), 2.0);
        assert_eq!(MathObject::round(-1.5), -1.0);
        assert_eq!(MathObject::round(-2.6), -3.0);
    }

    #[test]
    fn test_random_in_range() {
        for _ in 0..100 {
            let r = MathObject::random();
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn test_max_min() {
        assert_eq!(MathObject::max(&[1.0, 3.0, 2.0]), 3.0);
        assert_eq!(MathObject::max(&[]), f64::NEG_INFINITY);
        assert!(MathObject::min(&[1.0, f64::NAN]).is_nan());
    }

    #[test]
    fn test_math_object_functions() {
        assert_eq!(call("floor", vec![Value::Number(2.7)]), 2.0);
        assert_eq!(call("pow", vec![Value::Number(2.0), Value::Number(10.0)]), 1024.0);
        assert_eq!(call("max", vec![Value::Number(1.0), Value::from("5")]), 5.0);
        assert_eq!(call("hypot", vec![Value::Number(3.0), Value::Number(4.0)]), 5.0);
        assert!(call("sqrt", vec![Value::Number(-1.0)]).is_nan());
    }

    #[test]
    fn test_constants() {
        let math = MathObject::object();
        assert_eq!(math.get_property("PI").to_number(), MathObject::PI);
    }
}
