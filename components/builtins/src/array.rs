//! Array.prototype methods

use crate::iterator::collect_iterable;
use core_types::{arg, ArrayRef, Callable, JsError, JsResult, NativeFunction, Value};
use std::cmp::Ordering;

/// Array.prototype methods
pub struct ArrayPrototype;

fn this_array(this: &Value, method: &str) -> JsResult<ArrayRef> {
    match this {
        Value::Array(arr) => Ok(arr.clone()),
        other => Err(JsError::type_error(format!(
            "Array.prototype.{} called on {}",
            method,
            other.type_of()
        ))),
    }
}

fn callback(args: &[Value], method: &str) -> JsResult<Value> {
    match args.first() {
        Some(f @ Value::Function(_)) => Ok(f.clone()),
        other => Err(JsError::type_error(format!(
            "{} is not a function (in Array.prototype.{})",
            other.cloned().unwrap_or(Value::Undefined),
            method
        ))),
    }
}

/// Resolve a relative index argument (negative counts from the end).
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

/// Snapshot of the elements so callbacks may mutate the array safely.
fn elements(arr: &ArrayRef) -> Vec<Value> {
    arr.borrow().clone()
}

impl ArrayPrototype {
    /// Default `sort` order: by string value, `undefined` last.
    pub fn default_compare(a: &Value, b: &Value) -> Ordering {
        match (a.is_undefined(), b.is_undefined()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => a.to_string().cmp(&b.to_string()),
        }
    }

    /// Stable sort with a fallible comparator.
    pub fn sort_values<F>(values: &mut [Value], mut compare: F) -> JsResult<()>
    where
        F: FnMut(&Value, &Value) -> JsResult<Ordering>,
    {
        let mut failure = None;
        values.sort_by(|a, b| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            match compare(a, b) {
                Ok(ordering) => ordering,
                Err(err) => {
                    failure = Some(err);
                    Ordering::Equal
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Array.prototype.join(separator)
    pub fn join(values: &[Value], separator: &str) -> String {
        values
            .iter()
            .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Flatten nested arrays up to `depth` levels.
    pub fn flatten(values: &[Value], depth: usize, out: &mut Vec<Value>) {
        for value in values {
            match value {
                Value::Array(inner) if depth > 0 => {
                    Self::flatten(&inner.borrow(), depth - 1, out);
                }
                other => out.push(other.clone()),
            }
        }
    }

    /// Look up an Array.prototype method by name.
    pub fn method(name: &str) -> Option<Value> {
        let f = match name {
            "push" => NativeFunction::value(name, |this, args| {
                let arr = this_array(this, "push")?;
                let mut arr = arr.borrow_mut();
                arr.extend(args);
                Ok(Value::from(arr.len()))
            }),
            "pop" => NativeFunction::value(name, |this, _| {
                let arr = this_array(this, "pop")?;
                let popped = arr.borrow_mut().pop();
                Ok(popped.unwrap_or(Value::Undefined))
            }),
            "shift" => NativeFunction::value(name, |this, _| {
                let arr = this_array(this, "shift")?;
                let mut arr = arr.borrow_mut();
                if arr.is_empty() {
                    Ok(Value::Undefined)
                } else {
                    Ok(arr.remove(0))
                }
            }),
            "unshift" => NativeFunction::value(name, |this, args| {
                let arr = this_array(this, "unshift")?;
                let mut arr = arr.borrow_mut();
                for (i, value) in args.into_iter().enumerate() {
                    arr.insert(i, value);
                }
                Ok(Value::from(arr.len()))
            }),
            "slice" => NativeFunction::value(name, |this, args| {
                let arr = this_array(this, "slice")?;
                let arr = arr.borrow();
                let start = relative_index(&arg(&args, 0), arr.len(), 0);
                let end = relative_index(&arg(&args, 1), arr.len(), arr.len());
                let sliced = if start < end {
                    arr[start..end].to_vec()
                } else {
                    Vec::new()
                };
                Ok(Value::new_array(sliced))
            }),
            "splice" => NativeFunction::value(name, |this, args| {
                let arr = this_array(this, "splice")?;
                let mut arr = arr.borrow_mut();
                let len = arr.len();
                let start = relative_index(&arg(&args, 0), len, 0);
                let delete_count = match args.get(1) {
                    None => len - start,
                    Some(v) => {
                        let n = v.to_number();
                        if n.is_nan() {
                            0
                        } else {
                            (n.max(0.0) as usize).min(len - start)
                        }
                    }
                };
                let inserted: Vec<Value> = args.iter().skip(2).cloned().collect();
                let removed: Vec<Value> = arr.splice(start..start + delete_count, inserted).collect();
                Ok(Value::new_array(removed))
            }),
            "concat" => NativeFunction::value(name, |this, args| {
                let mut out = elements(&this_array(this, "concat")?);
                for value in args {
                    match value {
                        Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                        other => out.push(other),
                    }
                }
                Ok(Value::new_array(out))
            }),
            "join" => NativeFunction::value(name, |this, args| {
                let arr = this_array(this, "join")?;
                let separator = match arg(&args, 0) {
                    Value::Undefined => ",".to_string(),
                    other => other.to_string(),
                };
                let values = elements(&arr);
                Ok(Value::String(Self::join(&values, &separator)))
            }),
            "reverse" => NativeFunction::value(name, |this, _| {
                this_array(this, "reverse")?.borrow_mut().reverse();
                Ok(this.clone())
            }),
            "indexOf" => NativeFunction::value(name, |this, args| {
                let values = elements(&this_array(this, "indexOf")?);
                let target = arg(&args, 0);
                let from = relative_index(&arg(&args, 1), values.len(), 0);
                Ok(Value::Number(
                    values
                        .iter()
                        .enumerate()
                        .skip(from)
                        .find(|(_, v)| v.strict_equals(&target))
                        .map(|(i, _)| i as f64)
                        .unwrap_or(-1.0),
                ))
            }),
            "lastIndexOf" => NativeFunction::value(name, |this, args| {
                let values = elements(&this_array(this, "lastIndexOf")?);
                let target = arg(&args, 0);
                Ok(Value::Number(
                    values
                        .iter()
                        .rposition(|v| v.strict_equals(&target))
                        .map(|i| i as f64)
                        .unwrap_or(-1.0),
                ))
            }),
            "includes" => NativeFunction::value(name, |this, args| {
                let values = elements(&this_array(this, "includes")?);
                let target = arg(&args, 0);
                Ok(Value::Boolean(values.iter().any(|v| {
                    v.same_value(&target) || v.strict_equals(&target)
                })))
            }),
            "at" => NativeFunction::value(name, |this, args| {
                let values = elements(&this_array(this, "at")?);
                let n = arg(&args, 0).to_number();
                let n = if n.is_nan() { 0.0 } else { n.trunc() };
                let index = if n < 0.0 { values.len() as f64 + n } else { n };
                if index < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(values.get(index as usize).cloned().unwrap_or(Value::Undefined))
            }),
            "forEach" => NativeFunction::value(name, |this, args| {
                let f = callback(&args, "forEach")?;
                for (i, value) in elements(&this_array(this, "forEach")?).into_iter().enumerate() {
                    f.call(arg(&args, 1), vec![value, Value::from(i), this.clone()])?;
                }
                Ok(Value::Undefined)
            }),
            "map" => NativeFunction::value(name, |this, args| {
                let f = callback(&args, "map")?;
                let mut out = Vec::new();
                for (i, value) in elements(&this_array(this, "map")?).into_iter().enumerate() {
                    out.push(f.call(arg(&args, 1), vec![value, Value::from(i), this.clone()])?);
                }
                Ok(Value::new_array(out))
            }),
            "filter" => NativeFunction::value(name, |this, args| {
                let f = callback(&args, "filter")?;
                let mut out = Vec::new();
                for (i, value) in elements(&this_array(this, "filter")?).into_iter().enumerate() {
                    if f.call(arg(&args, 1), vec![value.clone(), Value::from(i), this.clone()])?
                        .is_truthy()
                    {
                        out.push(value);
                    }
                }
                Ok(Value::new_array(out))
            }),
            "find" | "findIndex" | "findLast" | "findLastIndex" => {
                let want_index = name.ends_with("Index");
                let from_end = name.starts_with("findLast");
                NativeFunction::value(name, move |this, args| {
                    let f = callback(&args, "find")?;
                    let mut indexed: Vec<(usize, Value)> =
                        elements(&this_array(this, "find")?).into_iter().enumerate().collect();
                    if from_end {
                        indexed.reverse();
                    }
                    for (i, value) in indexed {
                        if f.call(arg(&args, 1), vec![value.clone(), Value::from(i), this.clone()])?
                            .is_truthy()
                        {
                            return Ok(if want_index { Value::from(i) } else { value });
                        }
                    }
                    Ok(if want_index {
                        Value::Number(-1.0)
                    } else {
                        Value::Undefined
                    })
                })
            }
            "some" | "every" => {
                let every = name == "every";
                NativeFunction::value(name, move |this, args| {
                    let f = callback(&args, if every { "every" } else { "some" })?;
                    for (i, value) in elements(&this_array(this, "some")?).into_iter().enumerate() {
                        let hit = f
                            .call(arg(&args, 1), vec![value, Value::from(i), this.clone()])?
                            .is_truthy();
                        if hit != every {
                            return Ok(Value::Boolean(!every));
                        }
                    }
                    Ok(Value::Boolean(every))
                })
            }
            "reduce" | "reduceRight" => {
                let right = name == "reduceRight";
                NativeFunction::value(name, move |this, args| {
                    let f = callback(&args, "reduce")?;
                    let mut indexed: Vec<(usize, Value)> =
                        elements(&this_array(this, "reduce")?).into_iter().enumerate().collect();
                    if right {
                        indexed.reverse();
                    }
                    let mut iter = indexed.into_iter();
                    let mut acc = match args.get(1) {
                        Some(initial) => initial.clone(),
                        None => match iter.next() {
                            Some((_, first)) => first,
                            None => {
                                return Err(JsError::type_error(
                                    "Reduce of empty array with no initial value",
                                ))
                            }
                        },
                    };
                    for (i, value) in iter {
                        acc = f.call(
                            Value::Undefined,
                            vec![acc, value, Value::from(i), this.clone()],
                        )?;
                    }
                    Ok(acc)
                })
            }
            "sort" => NativeFunction::value(name, |this, args| {
                let arr = this_array(this, "sort")?;
                let mut values = elements(&arr);
                match arg(&args, 0) {
                    Value::Function(f) => Self::sort_values(&mut values, |a, b| {
                        let result = f.call(Value::Undefined, vec![a.clone(), b.clone()])?;
                        let n = result.to_number();
                        Ok(if n < 0.0 {
                            Ordering::Less
                        } else if n > 0.0 {
                            Ordering::Greater
                        } else {
                            Ordering::Equal
                        })
                    })?,
                    Value::Undefined => {
                        Self::sort_values(&mut values, |a, b| Ok(Self::default_compare(a, b)))?
                    }
                    _ => {
                        return Err(JsError::type_error(
                            "The comparison function must be either a function or undefined",
                        ))
                    }
                }
                *arr.borrow_mut() = values;
                Ok(this.clone())
            }),
            "flat" => NativeFunction::value(name, |this, args| {
                let depth = match arg(&args, 0) {
                    Value::Undefined => 1,
                    other => other.to_number().max(0.0) as usize,
                };
                let mut out = Vec::new();
                Self::flatten(&elements(&this_array(this, "flat")?), depth, &mut out);
                Ok(Value::new_array(out))
            }),
            "flatMap" => NativeFunction::value(name, |this, args| {
                let f = callback(&args, "flatMap")?;
                let mut mapped = Vec::new();
                for (i, value) in elements(&this_array(this, "flatMap")?).into_iter().enumerate() {
                    mapped.push(f.call(arg(&args, 1), vec![value, Value::from(i), this.clone()])?);
                }
                let mut out = Vec::new();
                Self::flatten(&mapped, 1, &mut out);
                Ok(Value::new_array(out))
            }),
            "fill" => NativeFunction::value(name, |this, args| {
                let arr = this_array(this, "fill")?;
                let len = arr.borrow().len();
                let start = relative_index(&arg(&args, 1), len, 0);
                let end = relative_index(&arg(&args, 2), len, len);
                let value = arg(&args, 0);
                for slot in arr.borrow_mut().iter_mut().take(end).skip(start) {
                    *slot = value.clone();
                }
                Ok(this.clone())
            }),
            "keys" => NativeFunction::value(name, |this, _| {
                let len = this_array(this, "keys")?.borrow().len();
                Ok(Value::new_array((0..len).map(Value::from).collect()))
            }),
            "entries" => NativeFunction::value(name, |this, _| {
                let values = elements(&this_array(this, "entries")?);
                Ok(Value::new_array(
                    values
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| Value::new_array(vec![Value::from(i), v]))
                        .collect(),
                ))
            }),
            "toString" => NativeFunction::value(name, |this, _| {
                let values = elements(&this_array(this, "toString")?);
                Ok(Value::String(Self::join(&values, ",")))
            }),
            _ => return None,
        };
        Some(f)
    }

    /// Static methods of the `Array` constructor.
    pub fn constructor() -> Value {
        let array = NativeFunction::new("Array", |_, args| Ok(Self::create(args)))
            .with_constructor(|args| Ok(Self::create(args)))
            .with_static(
                "isArray",
                NativeFunction::value("isArray", |_, args| {
                    Ok(Value::Boolean(matches!(arg(&args, 0), Value::Array(_))))
                }),
            )
            .with_static(
                "of",
                NativeFunction::value("of", |_, args| Ok(Value::new_array(args))),
            )
            .with_static(
                "from",
                NativeFunction::value("from", |_, args| {
                    let source = arg(&args, 0);
                    let values = match &source {
                        Value::Object(obj) if !obj.borrow().properties.contains_key("next") => {
                            let len = source.get_property("length").to_number();
                            let len = if len.is_nan() { 0 } else { len.max(0.0) as usize };
                            (0..len)
                                .map(|i| source.get_property(&i.to_string()))
                                .collect()
                        }
                        other => collect_iterable(other)?,
                    };
                    match arg(&args, 1) {
                        Value::Function(f) => {
                            let mut out = Vec::with_capacity(values.len());
                            for (i, value) in values.into_iter().enumerate() {
                                out.push(f.call(Value::Undefined, vec![value, Value::from(i)])?);
                            }
                            Ok(Value::new_array(out))
                        }
                        _ => Ok(Value::new_array(values)),
                    }
                }),
            );
        Value::Function(std::rc::Rc::new(array))
    }

    fn create(args: Vec<Value>) -> Value {
        match args.as_slice() {
            [Value::Number(n)] if n.fract() == 0.0 && *n >= 0.0 => {
                Value::new_array(vec![Value::Undefined; *n as usize])
            }
            _ => Value::new_array(args),
        }
    }
}
