//! Lexer - turns source text into [`Token`]s
//!
//! Operators are matched longest first. Templates are lexed in full: each
//! `${...}` substitution becomes its own nested token list. A `/` starts a
//! regular expression when no operand precedes it.

use crate::token::{Keyword, Punctuator, Template, Token, TokenKind};
use core_types::{validate_flags, JsError, JsResult, SourcePosition};
use num_bigint::BigInt;

/// Lexer for expression-language source code
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    /// The previous token could end an operand, so `/` means division
    after_operand: bool,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            after_operand: false,
        }
    }

    /// Lex the whole source. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> JsResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> JsResult<Token> {
        let newline_before = self.skip_whitespace_and_comments()?;
        let start = self.current_position();
        if self.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, start, newline_before));
        }
        let kind = self.scan_token(start)?;
        let token = Token::new(kind, start, newline_before);
        self.after_operand = token.ends_operand();
        Ok(token)
    }

    fn scan_token(&mut self, start: SourcePosition) -> JsResult<TokenKind> {
        let ch = self.advance();
        let punct = |p| Ok(TokenKind::Punctuator(p));

        match ch {
            '(' => punct(Punctuator::LParen),
            ')' => punct(Punctuator::RParen),
            '{' => punct(Punctuator::LBrace),
            '}' => punct(Punctuator::RBrace),
            '[' => punct(Punctuator::LBracket),
            ']' => punct(Punctuator::RBracket),
            ';' => punct(Punctuator::Semicolon),
            ',' => punct(Punctuator::Comma),
            ':' => punct(Punctuator::Colon),
            '~' => punct(Punctuator::Tilde),

            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    punct(Punctuator::Spread)
                } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_number('.', start)
                } else {
                    punct(Punctuator::Dot)
                }
            }

            '?' => {
                if self.match_char('?') {
                    if self.match_char('=') {
                        punct(Punctuator::NullishCoalesceEq)
                    } else {
                        punct(Punctuator::NullishCoalesce)
                    }
                } else if self.peek() == Some('.')
                    && !self.peek_next().is_some_and(|c| c.is_ascii_digit())
                {
                    // `a ? .5 : 1` is a conditional, not optional chaining
                    self.advance();
                    punct(Punctuator::OptionalChain)
                } else {
                    punct(Punctuator::Question)
                }
            }

            '=' => {
                if self.match_char('>') {
                    punct(Punctuator::Arrow)
                } else if self.match_char('=') {
                    if self.match_char('=') {
                        punct(Punctuator::EqEqEq)
                    } else {
                        punct(Punctuator::EqEq)
                    }
                } else {
                    punct(Punctuator::Assign)
                }
            }

            '+' => {
                if self.match_char('+') {
                    punct(Punctuator::PlusPlus)
                } else if self.match_char('=') {
                    punct(Punctuator::PlusEq)
                } else {
                    punct(Punctuator::Plus)
                }
            }

            '-' => {
                if self.match_char('-') {
                    punct(Punctuator::MinusMinus)
                } else if self.match_char('=') {
                    punct(Punctuator::MinusEq)
                } else {
                    punct(Punctuator::Minus)
                }
            }

            '*' => {
                if self.match_char('*') {
                    if self.match_char('=') {
                        punct(Punctuator::StarStarEq)
                    } else {
                        punct(Punctuator::StarStar)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::StarEq)
                } else {
                    punct(Punctuator::Star)
                }
            }

            '/' => {
                if !self.after_operand {
                    self.scan_regexp(start)
                } else if self.match_char('=') {
                    punct(Punctuator::SlashEq)
                } else {
                    punct(Punctuator::Slash)
                }
            }

            '%' => {
                if self.match_char('=') {
                    punct(Punctuator::PercentEq)
                } else {
                    punct(Punctuator::Percent)
                }
            }

            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        punct(Punctuator::NotEqEq)
                    } else {
                        punct(Punctuator::NotEq)
                    }
                } else {
                    punct(Punctuator::Not)
                }
            }

            '<' => {
                if self.match_char('<') {
                    if self.match_char('=') {
                        punct(Punctuator::LtLtEq)
                    } else {
                        punct(Punctuator::LtLt)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::LtEq)
                } else {
                    punct(Punctuator::Lt)
                }
            }

            '>' => {
                if self.match_char('>') {
                    if self.match_char('>') {
                        if self.match_char('=') {
                            punct(Punctuator::GtGtGtEq)
                        } else {
                            punct(Punctuator::GtGtGt)
                        }
                    } else if self.match_char('=') {
                        punct(Punctuator::GtGtEq)
                    } else {
                        punct(Punctuator::GtGt)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::GtEq)
                } else {
                    punct(Punctuator::Gt)
                }
            }

            '&' => {
                if self.match_char('&') {
                    if self.match_char('=') {
                        punct(Punctuator::AndAndEq)
                    } else {
                        punct(Punctuator::AndAnd)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::AndEq)
                } else {
                    punct(Punctuator::And)
                }
            }

            '|' => {
                if self.match_char('|') {
                    if self.match_char('=') {
                        punct(Punctuator::OrOrEq)
                    } else {
                        punct(Punctuator::OrOr)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::OrEq)
                } else if self.match_char('>') {
                    punct(Punctuator::Pipeline)
                } else {
                    punct(Punctuator::Or)
                }
            }

            '^' => {
                if self.match_char('=') {
                    punct(Punctuator::XorEq)
                } else {
                    punct(Punctuator::Xor)
                }
            }

            '`' => self.scan_template(start),

            '"' | '\'' => self.scan_string(ch, start),

            '#' => {
                if self.peek().is_some_and(is_id_start) {
                    let first = self.advance();
                    Ok(TokenKind::PrivateName(self.scan_word(first)))
                } else {
                    Err(JsError::lex("Invalid or unexpected token '#'", start))
                }
            }

            _ if ch.is_ascii_digit() => self.scan_number(ch, start),

            _ if is_id_start(ch) => {
                let word = self.scan_word(ch);
                Ok(match Keyword::from_word(&word) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Identifier(word),
                })
            }

            _ => Err(JsError::lex(format!("Unexpected character '{}'", ch), start)),
        }
    }

    fn scan_word(&mut self, first: char) -> String {
        let mut word = first.to_string();
        while let Some(c) = self.peek().filter(|c| is_id_continue(*c)) {
            word.push(c);
            self.advance();
        }
        word
    }

    fn scan_string(&mut self, quote: char, start: SourcePosition) -> JsResult<TokenKind> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(JsError::lex("Unterminated string literal", start)),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(TokenKind::String { value, quote });
                }
                Some('\n' | '\r') => return Err(JsError::lex("Unterminated string literal", start)),
                Some('\\') => {
                    self.advance();
                    self.scan_escape(&mut value, start)?;
                }
                Some(_) => value.push(self.advance()),
            }
        }
    }

    /// Decode one escape sequence; the backslash is already consumed.
    fn scan_escape(&mut self, value: &mut String, start: SourcePosition) -> JsResult<()> {
        let escape_position = self.current_position();
        let Some(escaped) = self.peek() else {
            return Err(JsError::lex("Unterminated string literal", start));
        };
        self.advance();
        match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{0008}'),
            'f' => value.push('\u{000C}'),
            'v' => value.push('\u{000B}'),
            '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => value.push('\0'),
            '0'..='9' => {
                return Err(JsError::lex(
                    "Octal escape sequences are not allowed",
                    escape_position,
                ))
            }
            'x' => {
                let code = self.scan_hex_digits(2, escape_position)?;
                value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            'u' => {
                let code = if self.match_char('{') {
                    let mut code: u32 = 0;
                    let mut digits = 0;
                    while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                        self.advance();
                        code = code.saturating_mul(16).saturating_add(d);
                        digits += 1;
                    }
                    if digits == 0 || !self.match_char('}') || code > 0x10FFFF {
                        return Err(JsError::lex("Invalid Unicode escape sequence", escape_position));
                    }
                    code
                } else {
                    self.scan_hex_digits(4, escape_position)?
                };
                // Lone surrogates have no `char`; they decode to U+FFFD.
                value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            '\r' => {
                // Line continuation
                self.match_char('\n');
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => value.push(other),
        }
        Ok(())
    }

    fn scan_hex_digits(&mut self, count: usize, position: SourcePosition) -> JsResult<u32> {
        let mut code = 0;
        for _ in 0..count {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    self.advance();
                    code = code * 16 + d;
                }
                None => {
                    let message = if count == 2 {
                        "Invalid hexadecimal escape sequence"
                    } else {
                        "Invalid Unicode escape sequence"
                    };
                    return Err(JsError::lex(message, position));
                }
            }
        }
        Ok(code)
    }

    fn scan_template(&mut self, start: SourcePosition) -> JsResult<TokenKind> {
        let mut template = Template {
            quasis: Vec::new(),
            raws: Vec::new(),
            substitutions: Vec::new(),
        };
        let mut cooked = String::new();
        let mut raw = String::new();
        loop {
            match self.peek() {
                None => return Err(JsError::lex("Unterminated template literal", start)),
                Some('`') => {
                    self.advance();
                    template.quasis.push(cooked);
                    template.raws.push(raw);
                    return Ok(TokenKind::Template(Box::new(template)));
                }
                Some('$') if self.peek_next() == Some('{') => {
                    self.advance();
                    self.advance();
                    template.quasis.push(std::mem::take(&mut cooked));
                    template.raws.push(std::mem::take(&mut raw));
                    template.substitutions.push(self.scan_substitution(start)?);
                }
                Some('\\') => {
                    let from = self.position;
                    self.advance();
                    self.scan_escape(&mut cooked, start)?;
                    raw.extend(&self.chars[from..self.position]);
                }
                Some(_) => {
                    let c = self.advance();
                    cooked.push(c);
                    raw.push(c);
                }
            }
        }
    }

    /// Tokens of one `${...}` substitution; the `${` is already consumed.
    fn scan_substitution(&mut self, start: SourcePosition) -> JsResult<Vec<Token>> {
        self.after_operand = false;
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let token = self.next_token()?;
            match &token.kind {
                TokenKind::Eof => return Err(JsError::lex("Unterminated template literal", start)),
                TokenKind::Punctuator(Punctuator::LBrace) => depth += 1,
                TokenKind::Punctuator(Punctuator::RBrace) if depth == 0 => return Ok(tokens),
                TokenKind::Punctuator(Punctuator::RBrace) => depth -= 1,
                _ => {}
            }
            tokens.push(token);
        }
    }

    fn scan_regexp(&mut self, start: SourcePosition) -> JsResult<TokenKind> {
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    return Err(JsError::lex("Unterminated regular expression", start));
                }
                Some('\\') => {
                    pattern.push(self.advance());
                    match self.peek() {
                        Some(c) if !is_line_terminator(c) => pattern.push(self.advance()),
                        _ => return Err(JsError::lex("Unterminated regular expression", start)),
                    }
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    if c == '[' {
                        in_class = true;
                    } else if c == ']' {
                        in_class = false;
                    }
                    pattern.push(self.advance());
                }
            }
        }

        let mut flags = String::new();
        while let Some(c) = self.peek().filter(|c| is_id_continue(*c)) {
            flags.push(c);
            self.advance();
        }
        validate_flags(&flags).map_err(|message| JsError::lex(message, start))?;
        Ok(TokenKind::RegExp { pattern, flags })
    }

    fn scan_number(&mut self, first: char, start: SourcePosition) -> JsResult<TokenKind> {
        let begin = self.position - 1;

        // Radix-prefixed integers are tried before decimal scanning
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let digits = self.scan_digits(radix, false, start)?;
                if digits.is_empty() {
                    return Err(JsError::lex("Invalid or unexpected number literal", start));
                }
                if self.match_char('n') {
                    return BigInt::parse_bytes(digits.as_bytes(), radix)
                        .map(TokenKind::BigInt)
                        .ok_or_else(|| JsError::lex("Invalid BigInt literal", start));
                }
                let value = digits.chars().fold(0.0, |acc, c| {
                    acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0))
                });
                return Ok(TokenKind::Number {
                    value,
                    raw: self.chars[begin..self.position].iter().collect(),
                });
            }
        }

        let mut text = String::new();
        let mut is_integer = true;
        if first == '.' {
            text.push_str("0.");
            text.push_str(&self.scan_digits(10, false, start)?);
            is_integer = false;
        } else {
            text.push(first);
            text.push_str(&self.scan_digits(10, true, start)?);
            if self.peek() == Some('.') && self.takes_decimal_point() {
                self.advance();
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    text.push('.');
                    text.push_str(&self.scan_digits(10, false, start)?);
                }
                is_integer = false;
            }
        }

        // A malformed exponent rolls back to the decimal prefix
        if matches!(self.peek(), Some('e' | 'E')) {
            let saved = (self.position, self.column);
            self.advance();
            let mut exponent = String::from("e");
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.advance();
                exponent.push(sign);
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                exponent.push_str(&self.scan_digits(10, false, start)?);
                text.push_str(&exponent);
                is_integer = false;
            } else {
                (self.position, self.column) = saved;
            }
        }

        if self.peek() == Some('n') {
            if !is_integer {
                return Err(JsError::lex("Invalid BigInt literal", start));
            }
            self.advance();
            return text
                .parse::<BigInt>()
                .map(TokenKind::BigInt)
                .map_err(|_| JsError::lex("Invalid BigInt literal", start));
        }

        let value = text
            .parse::<f64>()
            .map_err(|_| JsError::lex("Invalid or unexpected number literal", start))?;
        Ok(TokenKind::Number {
            value,
            raw: self.chars[begin..self.position].iter().collect(),
        })
    }

    /// A `.` after integer digits belongs to the number unless a member
    /// name follows it: `1.5`, `1.e3`, `1.` and `1..toString()`, but not
    /// `1.toFixed`.
    fn takes_decimal_point(&self) -> bool {
        let at = |offset: usize| self.chars.get(self.position + offset).copied();
        match at(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('e' | 'E') => match at(2) {
                Some('+' | '-') => at(3).is_some_and(|c| c.is_ascii_digit()),
                next => next.is_some_and(|c| c.is_ascii_digit()),
            },
            Some(c) => !is_id_start(c),
            None => true,
        }
    }

    /// Digits of `radix`, with `_` separators removed. `after_digit` is set
    /// when the caller already consumed a digit of the same run.
    fn scan_digits(&mut self, radix: u32, after_digit: bool, start: SourcePosition) -> JsResult<String> {
        let mut digits = String::new();
        loop {
            match self.peek() {
                Some(c) if c.is_digit(radix) => {
                    digits.push(c);
                    self.advance();
                }
                Some('_') => {
                    let next_is_digit = self.peek_next().is_some_and(|c| c.is_digit(radix));
                    if (digits.is_empty() && !after_digit) || !next_is_digit {
                        return Err(JsError::lex(
                            "Numeric separators are only allowed between digits",
                            start,
                        ));
                    }
                    self.advance();
                }
                _ => return Ok(digits),
            }
        }
    }

    /// Skip whitespace and comments; true if a line terminator was crossed.
    fn skip_whitespace_and_comments(&mut self) -> JsResult<bool> {
        let mut newline = false;
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                newline = true;
                self.advance();
            } else if c.is_whitespace() || c == '\u{FEFF}' {
                self.advance();
            } else if c == '/' && self.peek_next() == Some('/') {
                while self.peek().is_some_and(|c| !is_line_terminator(c)) {
                    self.advance();
                }
            } else if c == '/' && self.peek_next() == Some('*') {
                let start = self.current_position();
                self.advance();
                self.advance();
                loop {
                    match self.peek() {
                        None => return Err(JsError::lex("Unterminated comment", start)),
                        Some('*') if self.peek_next() == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(c) => {
                            newline |= is_line_terminator(c);
                            self.advance();
                        }
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.position];
        self.position += 1;
        if c == '\n' || (c == '\r' && self.peek() != Some('\n')) || c == '\u{2028}' || c == '\u{2029}' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_id_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_id_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\u{200C}' || c == '\u{200D}'
}
