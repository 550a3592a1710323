//! RegExp.prototype methods and the regex-driven String methods
//! (`split`, `replace`, `match`).

use core_types::{arg, Callable, JsError, JsRegExp, JsResult, NativeFunction, Value};

/// RegExp.prototype methods
pub struct RegExpPrototype;

/// Expand `$&`, `$1`…`$99`, `` $` ``, `$'` and `$$` in a replacement string.
///
/// `groups[0]` is the whole match.
pub fn expand_replacement(template: &str, groups: &[Option<String>], index: usize, input: &str) -> String {
    let mut out = String::new();
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let matched = groups.first().cloned().flatten().unwrap_or_default();
        match chars[i + 1] {
            '$' => {
                out.push('$');
                i += 2;
            }
            '&' => {
                out.push_str(&matched);
                i += 2;
            }
            '`' => {
                out.extend(input.chars().take(index));
                i += 2;
            }
            '\'' => {
                out.extend(input.chars().skip(index + matched.chars().count()));
                i += 2;
            }
            d if d.is_ascii_digit() => {
                let mut digits = d.to_string();
                if let Some(next) = chars.get(i + 2).filter(|c| c.is_ascii_digit()) {
                    let two: usize = format!("{}{}", d, next).parse().unwrap_or(0);
                    if two > 0 && two < groups.len() {
                        digits.push(*next);
                    }
                }
                let n: usize = digits.parse().unwrap_or(0);
                if n > 0 && n < groups.len() {
                    out.push_str(groups[n].as_deref().unwrap_or(""));
                    i += 1 + digits.len();
                } else {
                    out.push('$');
                    i += 1;
                }
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
    out
}

fn char_index(input: &str, byte_index: usize) -> usize {
    input[..byte_index].chars().count()
}

fn this_regexp(this: &Value, method: &str) -> JsResult<std::rc::Rc<JsRegExp>> {
    match this {
        Value::RegExp(re) => Ok(re.clone()),
        other => Err(JsError::type_error(format!(
            "RegExp.prototype.{} called on incompatible receiver {}",
            method, other
        ))),
    }
}

impl RegExpPrototype {
    /// Split `input` at every match of `re`, keeping capture groups.
    pub fn split(re: &JsRegExp, input: &str, limit: usize) -> Vec<String> {
        let mut parts = Vec::new();
        let mut last = 0;
        for captures in re.regex().captures_iter(input) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if whole.end() == 0 || whole.start() == input.len() {
                continue;
            }
            parts.push(input[last..whole.start()].to_string());
            for group in captures.iter().skip(1) {
                parts.push(group.map(|m| m.as_str().to_string()).unwrap_or_default());
            }
            last = whole.end();
        }
        parts.push(input[last..].to_string());
        parts.into_iter().take(limit).collect()
    }

    /// Replace the first match (or every match for global expressions).
    pub fn replace(re: &JsRegExp, input: &str, replacement: &Value) -> JsResult<String> {
        let mut out = String::new();
        let mut last = 0;
        for captures in re.regex().captures_iter(input) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            out.push_str(&input[last..whole.start()]);
            let groups: Vec<Option<String>> = captures
                .iter()
                .map(|m| m.map(|m| m.as_str().to_string()))
                .collect();
            let index = char_index(input, whole.start());
            let piece = match replacement {
                Value::Function(f) => {
                    let mut args: Vec<Value> = groups
                        .iter()
                        .map(|g| g.clone().map(Value::String).unwrap_or(Value::Undefined))
                        .collect();
                    args.push(Value::from(index));
                    args.push(Value::from(input));
                    f.call(Value::Undefined, args)?.to_string()
                }
                other => expand_replacement(&other.to_string(), &groups, index, input),
            };
            out.push_str(&piece);
            last = whole.end();
            if !re.is_global() {
                break;
            }
        }
        out.push_str(&input[last..]);
        Ok(out)
    }

    /// `String.prototype.match`: all matches for global expressions,
    /// otherwise the first match with its groups; `null` when nothing matches.
    pub fn match_str(re: &JsRegExp, input: &str) -> Value {
        if re.is_global() {
            let found: Vec<Value> = re
                .regex()
                .find_iter(input)
                .map(|m| Value::from(m.as_str()))
                .collect();
            if found.is_empty() {
                Value::Null
            } else {
                Value::new_array(found)
            }
        } else {
            match re.regex().captures(input) {
                Some(captures) => Value::new_array(
                    captures
                        .iter()
                        .map(|m| m.map(|m| Value::from(m.as_str())).unwrap_or(Value::Undefined))
                        .collect(),
                ),
                None => Value::Null,
            }
        }
    }

    /// Look up a RegExp.prototype method by name.
    pub fn method(name: &str) -> Option<Value> {
        let f = match name {
            "test" => NativeFunction::value(name, |this, args| {
                let re = this_regexp(this, "test")?;
                Ok(Value::Boolean(re.test(&arg(&args, 0).to_string())))
            }),
            "exec" => NativeFunction::value(name, |this, args| {
                let re = this_regexp(this, "exec")?;
                let input = arg(&args, 0).to_string();
                Ok(match re.exec(&input) {
                    Some((_, groups)) => Value::new_array(
                        groups
                            .into_iter()
                            .map(|g| g.map(Value::String).unwrap_or(Value::Undefined))
                            .collect(),
                    ),
                    None => Value::Null,
                })
            }),
            "toString" => NativeFunction::value(name, |this, _| {
                Ok(Value::String(this_regexp(this, "toString")?.to_string()))
            }),
            _ => return None,
        };
        Some(f)
    }
}
