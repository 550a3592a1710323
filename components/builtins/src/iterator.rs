//! Iteration over arrays, strings and iterator objects.
//!
//! An iterator object is any object with a callable `next` method returning
//! `{ value, done }`; generator objects produced by the interpreter follow
//! this shape.

use crate::value::get_member;
use core_types::{ArrayRef, JsError, JsResult, Value};

/// Cursor over an iterable value.
pub enum ValueIterator {
    /// Live view of an array: elements pushed during iteration are visited.
    Elements {
        /// Array being iterated
        items: ArrayRef,
        /// Next index
        index: usize,
    },
    /// Characters of a string
    Chars {
        /// Remaining characters
        chars: Vec<char>,
        /// Next index
        index: usize,
    },
    /// Object following the iterator protocol
    Protocol {
        /// The iterator object
        iterator: Value,
        /// Its `next` method
        next: Value,
    },
}

impl ValueIterator {
    /// Start iterating `value`.
    pub fn new(value: &Value) -> JsResult<Self> {
        match value {
            Value::Array(items) => Ok(ValueIterator::Elements {
                items: items.clone(),
                index: 0,
            }),
            Value::String(s) => Ok(ValueIterator::Chars {
                chars: s.chars().collect(),
                index: 0,
            }),
            Value::Object(_) => {
                let next = get_member(value, "next")?;
                if matches!(next, Value::Function(_)) {
                    Ok(ValueIterator::Protocol {
                        iterator: value.clone(),
                        next,
                    })
                } else {
                    Err(not_iterable(value))
                }
            }
            other => Err(not_iterable(other)),
        }
    }

    /// The iterator object, for protocol iterators.
    pub fn iterator_object(&self) -> Option<&Value> {
        match self {
            ValueIterator::Protocol { iterator, .. } => Some(iterator),
            _ => None,
        }
    }

    /// Produce the next value, or `None` when exhausted.
    pub fn next_value(&mut self) -> JsResult<Option<Value>> {
        match self {
            ValueIterator::Elements { items, index } => {
                let item = items.borrow().get(*index).cloned();
                *index += 1;
                Ok(item)
            }
            ValueIterator::Chars { chars, index } => {
                let item = chars.get(*index).map(|c| Value::String(c.to_string()));
                *index += 1;
                Ok(item)
            }
            ValueIterator::Protocol { iterator, next } => {
                let result = next.call(iterator.clone(), Vec::new())?;
                if result.is_primitive() {
                    return Err(JsError::type_error(format!(
                        "Iterator result {} is not an object",
                        result
                    )));
                }
                if get_member(&result, "done")?.is_truthy() {
                    Ok(None)
                } else {
                    get_member(&result, "value").map(Some)
                }
            }
        }
    }

    /// Notify a protocol iterator that iteration stopped early
    /// (`break`, `return` or an exception inside the loop body).
    pub fn close(&mut self) -> JsResult<()> {
        if let ValueIterator::Protocol { iterator, .. } = self {
            let ret = get_member(iterator, "return")?;
            if let Value::Function(_) = ret {
                ret.call(iterator.clone(), Vec::new())?;
            }
        }
        Ok(())
    }
}

fn not_iterable(value: &Value) -> JsError {
    JsError::type_error(format!("{} is not iterable", value.type_of()))
}

/// Build the `{ value, done }` object returned by iterator `next` methods.
pub fn iter_result(value: Value, done: bool) -> Value {
    Value::object_from([("value", value), ("done", Value::Boolean(done))])
}

/// Drain an iterable into a vector.
pub fn collect_iterable(value: &Value) -> JsResult<Vec<Value>> {
    let mut iter = ValueIterator::new(value)?;
    let mut out = Vec::new();
    while let Some(item) = iter.next_value()? {
        out.push(item);
    }
    Ok(out)
}
