//! String.prototype methods
//!
//! Indices count characters (Unicode scalar values), not UTF-16 code units.

use crate::regexp::{expand_replacement, RegExpPrototype};
use core_types::{arg, Callable, JsError, JsResult, NativeFunction, Value};

/// String.prototype methods
pub struct StringPrototype;

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

fn clamp_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        0
    } else {
        n.max(0.0).min(len as f64) as usize
    }
}

fn this_string(this: &Value, method: &str) -> JsResult<String> {
    if this.is_nullish() {
        return Err(JsError::type_error(format!(
            "String.prototype.{} called on null or undefined",
            method
        )));
    }
    Ok(this.to_string())
}

impl StringPrototype {
    /// String.prototype.substring(start, end)
    pub fn substring(s: &str, start: usize, end: Option<usize>) -> String {
        let len = s.chars().count();
        let start_idx = start.min(len);
        let end_idx = end.unwrap_or(len).min(len);
        let (from, to) = if start_idx <= end_idx {
            (start_idx, end_idx)
        } else {
            (end_idx, start_idx)
        };
        s.chars().skip(from).take(to - from).collect()
    }

    /// String.prototype.slice(start, end) with already resolved indices
    pub fn slice(s: &str, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        s.chars().skip(start).take(end - start).collect()
    }

    /// String.prototype.indexOf(search, from)
    pub fn index_of(s: &str, search: &str, from: usize) -> Option<usize> {
        let chars: Vec<char> = s.chars().collect();
        let needle: Vec<char> = search.chars().collect();
        if needle.is_empty() {
            return Some(from.min(chars.len()));
        }
        (from..chars.len()).find(|&i| chars[i..].starts_with(&needle))
    }

    /// String.prototype.lastIndexOf(search)
    pub fn last_index_of(s: &str, search: &str) -> Option<usize> {
        let chars: Vec<char> = s.chars().collect();
        let needle: Vec<char> = search.chars().collect();
        if needle.len() > chars.len() {
            return None;
        }
        (0..=chars.len() - needle.len())
            .rev()
            .find(|&i| chars[i..].starts_with(&needle))
    }

    /// String.prototype.split(separator, limit) for string separators
    pub fn split(s: &str, separator: &str, limit: usize) -> Vec<String> {
        let parts: Vec<String> = if separator.is_empty() {
            s.chars().map(|c| c.to_string()).collect()
        } else {
            s.split(separator).map(|part| part.to_string()).collect()
        };
        parts.into_iter().take(limit).collect()
    }

    /// String.prototype.padStart / padEnd
    pub fn pad(s: &str, target_len: usize, filler: &str, at_start: bool) -> String {
        let len = s.chars().count();
        if target_len <= len || filler.is_empty() {
            return s.to_string();
        }
        let padding: String = filler.chars().cycle().take(target_len - len).collect();
        if at_start {
            format!("{}{}", padding, s)
        } else {
            format!("{}{}", s, padding)
        }
    }

    /// String.prototype.replace / replaceAll with a string pattern
    pub fn replace_str(
        s: &str,
        search: &str,
        replacement: &Value,
        all: bool,
    ) -> JsResult<String> {
        let mut result = String::new();
        let mut rest = s;
        let mut offset = 0;
        loop {
            let found = rest.find(search);
            let Some(pos) = found else {
                result.push_str(rest);
                break;
            };
            result.push_str(&rest[..pos]);
            let index = s[..offset + pos].chars().count();
            let piece = match replacement {
                Value::Function(f) => f
                    .call(
                        Value::Undefined,
                        vec![Value::from(search), Value::from(index), Value::from(s)],
                    )?
                    .to_string(),
                other => expand_replacement(&other.to_string(), &[Some(search.to_string())], index, s),
            };
            result.push_str(&piece);
            let advance = pos + search.len();
            if search.is_empty() {
                match rest[pos..].chars().next() {
                    Some(c) => {
                        result.push(c);
                        offset += pos + c.len_utf8();
                        rest = &rest[pos + c.len_utf8()..];
                    }
                    None => break,
                }
            } else {
                offset += advance;
                rest = &rest[advance..];
            }
            if !all {
                result.push_str(rest);
                break;
            }
        }
        Ok(result)
    }

    /// Look up a String.prototype method by name.
    pub fn method(name: &str) -> Option<Value> {
        let f = match name {
            "charAt" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "charAt")?;
                let index = arg(&args, 0).to_number();
                let index = if index.is_nan() { 0.0 } else { index };
                Ok(Value::String(
                    if index < 0.0 {
                        None
                    } else {
                        s.chars().nth(index as usize)
                    }
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                ))
            }),
            "charCodeAt" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "charCodeAt")?;
                let index = arg(&args, 0).to_number();
                let index = if index.is_nan() { 0.0 } else { index };
                Ok(Value::Number(
                    if index < 0.0 {
                        None
                    } else {
                        s.chars().nth(index as usize)
                    }
                    .map(|c| c as u32 as f64)
                    .unwrap_or(f64::NAN),
                ))
            }),
            "at" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "at")?;
                let len = s.chars().count() as f64;
                let n = arg(&args, 0).to_number();
                let n = if n.is_nan() { 0.0 } else { n.trunc() };
                let index = if n < 0.0 { len + n } else { n };
                if index < 0.0 || index >= len {
                    return Ok(Value::Undefined);
                }
                Ok(s.chars()
                    .nth(index as usize)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined))
            }),
            "indexOf" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "indexOf")?;
                let from = clamp_index(&arg(&args, 1), s.chars().count(), 0);
                Ok(Value::Number(
                    Self::index_of(&s, &arg(&args, 0).to_string(), from)
                        .map(|i| i as f64)
                        .unwrap_or(-1.0),
                ))
            }),
            "lastIndexOf" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "lastIndexOf")?;
                Ok(Value::Number(
                    Self::last_index_of(&s, &arg(&args, 0).to_string())
                        .map(|i| i as f64)
                        .unwrap_or(-1.0),
                ))
            }),
            "includes" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "includes")?;
                Ok(Value::Boolean(s.contains(&arg(&args, 0).to_string())))
            }),
            "startsWith" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "startsWith")?;
                let from = clamp_index(&arg(&args, 1), s.chars().count(), 0);
                let tail: String = s.chars().skip(from).collect();
                Ok(Value::Boolean(tail.starts_with(&arg(&args, 0).to_string())))
            }),
            "endsWith" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "endsWith")?;
                let len = s.chars().count();
                let end = clamp_index(&arg(&args, 1), len, len);
                let head: String = s.chars().take(end).collect();
                Ok(Value::Boolean(head.ends_with(&arg(&args, 0).to_string())))
            }),
            "slice" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "slice")?;
                let len = s.chars().count();
                let start = relative_index(&arg(&args, 0), len, 0);
                let end = relative_index(&arg(&args, 1), len, len);
                Ok(Value::String(Self::slice(&s, start, end)))
            }),
            "substring" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "substring")?;
                let len = s.chars().count();
                let start = clamp_index(&arg(&args, 0), len, 0);
                let end = clamp_index(&arg(&args, 1), len, len);
                Ok(Value::String(Self::substring(&s, start, Some(end))))
            }),
            "toUpperCase" | "toLocaleUpperCase" => NativeFunction::value(name, |this, _| {
                Ok(Value::String(this_string(this, "toUpperCase")?.to_uppercase()))
            }),
            "toLowerCase" | "toLocaleLowerCase" => NativeFunction::value(name, |this, _| {
                Ok(Value::String(this_string(this, "toLowerCase")?.to_lowercase()))
            }),
            "trim" => NativeFunction::value(name, |this, _| {
                Ok(Value::from(this_string(this, "trim")?.trim()))
            }),
            "trimStart" => NativeFunction::value(name, |this, _| {
                Ok(Value::from(this_string(this, "trimStart")?.trim_start()))
            }),
            "trimEnd" => NativeFunction::value(name, |this, _| {
                Ok(Value::from(this_string(this, "trimEnd")?.trim_end()))
            }),
            "padStart" | "padEnd" => {
                let at_start = name == "padStart";
                NativeFunction::value(name, move |this, args| {
                    let s = this_string(this, "pad")?;
                    let target = arg(&args, 0).to_number();
                    let target = if target.is_nan() { 0 } else { target.max(0.0) as usize };
                    let filler = match arg(&args, 1) {
                        Value::Undefined => " ".to_string(),
                        other => other.to_string(),
                    };
                    Ok(Value::String(Self::pad(&s, target, &filler, at_start)))
                })
            }
            "repeat" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "repeat")?;
                let count = arg(&args, 0).to_number();
                if count < 0.0 || count.is_infinite() {
                    return Err(JsError::range_error(format!("Invalid count value: {}", count)));
                }
                let count = if count.is_nan() { 0 } else { count as usize };
                Ok(Value::String(s.repeat(count)))
            }),
            "concat" => NativeFunction::value(name, |this, args| {
                let mut s = this_string(this, "concat")?;
                for value in args {
                    s.push_str(&value.to_string());
                }
                Ok(Value::String(s))
            }),
            "split" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "split")?;
                let limit = match arg(&args, 1) {
                    Value::Undefined => usize::MAX,
                    other => other.to_uint32() as usize,
                };
                let parts = match arg(&args, 0) {
                    Value::Undefined => vec![s.clone()],
                    Value::RegExp(re) => RegExpPrototype::split(&re, &s, limit),
                    sep => Self::split(&s, &sep.to_string(), limit),
                };
                Ok(Value::new_array(parts.into_iter().map(Value::String).collect()))
            }),
            "replace" | "replaceAll" => {
                let all = name == "replaceAll";
                NativeFunction::value(name, move |this, args| {
                    let s = this_string(this, "replace")?;
                    let replacement = arg(&args, 1);
                    match arg(&args, 0) {
                        Value::RegExp(re) => {
                            if all && !re.is_global() {
                                return Err(JsError::type_error(
                                    "replaceAll must be called with a global RegExp",
                                ));
                            }
                            RegExpPrototype::replace(&re, &s, &replacement).map(Value::String)
                        }
                        pattern => {
                            Self::replace_str(&s, &pattern.to_string(), &replacement, all)
                                .map(Value::String)
                        }
                    }
                })
            }
            "match" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "match")?;
                match arg(&args, 0) {
                    Value::RegExp(re) => Ok(RegExpPrototype::match_str(&re, &s)),
                    other => {
                        let re = core_types::JsRegExp::new(&regex::escape(&other.to_string()), "")?;
                        Ok(RegExpPrototype::match_str(&re, &s))
                    }
                }
            }),
            "search" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "search")?;
                let index = match arg(&args, 0) {
                    Value::RegExp(re) => re
                        .regex()
                        .find(&s)
                        .map(|m| s[..m.start()].chars().count() as f64),
                    other => Self::index_of(&s, &other.to_string(), 0).map(|i| i as f64),
                };
                Ok(Value::Number(index.unwrap_or(-1.0)))
            }),
            "localeCompare" => NativeFunction::value(name, |this, args| {
                let s = this_string(this, "localeCompare")?;
                let other = arg(&args, 0).to_string();
                Ok(Value::Number(match s.cmp(&other) {
                    std::cmp::Ordering::Less => -1.0,
                    std::cmp::Ordering::Equal => 0.0,
                    std::cmp::Ordering::Greater => 1.0,
                }))
            }),
            "toString" | "valueOf" => NativeFunction::value(name, |this, _| {
                Ok(Value::String(this_string(this, "toString")?))
            }),
            _ => return None,
        };
        Some(f)
    }
}
