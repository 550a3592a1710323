//! Regular expression values backed by the `regex` crate.

use crate::{JsError, JsResult};
use regex::{Regex, RegexBuilder};
use std::cell::Cell;
use std::fmt;

/// Flags accepted after a regular expression literal.
pub const REGEXP_FLAGS: &str = "dgimsuvy";

/// A compiled regular expression literal.
pub struct JsRegExp {
    source: String,
    flags: String,
    regex: Regex,
    last_index: Cell<usize>,
}

impl JsRegExp {
    /// Compile `pattern` with the given flags.
    ///
    /// Patterns using features the `regex` crate does not support
    /// (backreferences, lookaround) fail with a `TypeError`.
    pub fn new(pattern: &str, flags: &str) -> JsResult<Self> {
        validate_flags(flags).map_err(JsError::type_error)?;
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|e| JsError::type_error(format!("Invalid regular expression /{}/: {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            flags: flags.to_string(),
            regex,
            last_index: Cell::new(0),
        })
    }

    /// Pattern text between the slashes.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Flag characters.
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// True if the `g` flag is set.
    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    /// Underlying compiled regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Current `lastIndex` (used by global/sticky matching).
    pub fn last_index(&self) -> usize {
        self.last_index.get()
    }

    /// Update `lastIndex`.
    pub fn set_last_index(&self, index: usize) {
        self.last_index.set(index);
    }

    /// `RegExp.prototype.test`.
    pub fn test(&self, input: &str) -> bool {
        self.exec(input).is_some()
    }

    /// `RegExp.prototype.exec`: returns the match and its capture groups,
    /// honouring `lastIndex` for global and sticky expressions.
    pub fn exec(&self, input: &str) -> Option<(usize, Vec<Option<String>>)> {
        let stateful = self.is_global() || self.flags.contains('y');
        let start = if stateful { self.last_index.get() } else { 0 };
        if start > input.len() || !input.is_char_boundary(start) {
            self.last_index.set(0);
            return None;
        }
        match self.regex.captures_at(input, start) {
            Some(captures) => {
                let whole = captures.get(0)?;
                if self.flags.contains('y') && whole.start() != start {
                    self.last_index.set(0);
                    return None;
                }
                if stateful {
                    let end = if whole.end() == whole.start() {
                        whole.end() + 1
                    } else {
                        whole.end()
                    };
                    self.last_index.set(end);
                }
                let groups = captures
                    .iter()
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect();
                Some((whole.start(), groups))
            }
            None => {
                if stateful {
                    self.last_index.set(0);
                }
                None
            }
        }
    }
}

/// Check that every flag is known and appears once.
pub fn validate_flags(flags: &str) -> Result<(), String> {
    let mut seen = String::new();
    for flag in flags.chars() {
        if !REGEXP_FLAGS.contains(flag) {
            return Err(format!("Invalid regular expression flag '{}'", flag));
        }
        if seen.contains(flag) {
            return Err(format!("Duplicate regular expression flag '{}'", flag));
        }
        seen.push(flag);
    }
    Ok(())
}

impl fmt::Display for JsRegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl fmt::Debug for JsRegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsRegExp({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        let re = JsRegExp::new("abc", "i").unwrap();
        assert!(re.test("xxABCxx"));
    }

    #[test]
    fn test_global_exec_advances() {
        let re = JsRegExp::new("a(\\d)", "g").unwrap();
        let (index, groups) = re.exec("a1 a2").unwrap();
        assert_eq!(index, 0);
        assert_eq!(groups[1].as_deref(), Some("1"));
        let (index, _) = re.exec("a1 a2").unwrap();
        assert_eq!(index, 3);
        assert!(re.exec("a1 a2").is_none());
        assert_eq!(re.last_index(), 0);
    }

    #[test]
    fn test_invalid_flags() {
        assert!(validate_flags("gg").is_err());
        assert!(validate_flags("q").is_err());
        assert!(validate_flags("gimsuy").is_ok());
    }

    #[test]
    fn test_display() {
        let re = JsRegExp::new("a+b", "g").unwrap();
        assert_eq!(re.to_string(), "/a+b/g");
    }
}
