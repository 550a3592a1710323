//! Statement parser
//!
//! A cursor over the token stream. Statements, function bodies, class bodies
//! and object literals are parsed structurally; every expression in between
//! is collected as a token window and handed to the expression reducer.

use crate::nesting;
use crate::expression::{has_top_level, matching, parse_params, parse_window, to_pattern, unexpected};
use crate::lexer::Lexer;
use crate::token::{Keyword, Punctuator, Token, TokenKind};
use core_types::{number_to_string, JsError, JsResult, SourcePosition};
use interpreter::node::{
    AssignmentExpression, BlockStatement, BreakStatement, CatchClause, Class, ContinueStatement, DoWhileStatement,
    EmptyStatement, ExpressionStatement, ForAwaitStatement, ForInStatement, ForOfStatement,
    ForStatement, Function, Identifier, IfStatement, LabeledStatement, MethodDefinition,
    MethodKind, NumberLiteral, ObjectExpression, Program, Property, PropertyDefinition,
    PropertyKind, ReturnStatement, SpreadElement, StaticBlock, StringLiteral, SwitchCase,
    SwitchStatement, ThrowStatement, TryStatement, VariableDeclaration, VariableDeclarator,
    WhileStatement,
};
use interpreter::{DeclarationKind, ExprNode, FunctionDef, FunctionForm, Node};
use std::rc::Rc;

/// Member names seen while parsing one class body.
#[derive(Debug, Default)]
pub struct ClassInfo {
    /// Number of constructors declared
    pub constructors: usize,
    /// Public instance member names
    pub public: Vec<String>,
    /// Private names, with the method kind or `None` for fields
    pub private: Vec<(String, Option<MethodKind>)>,
    /// Static member names
    pub statics: Vec<String>,
}

impl ClassInfo {
    /// Record a member. Computed keys pass `None` and are not tracked.
    pub fn record(
        &mut self,
        name: Option<&str>,
        is_static: bool,
        kind: Option<MethodKind>,
        position: SourcePosition,
    ) -> JsResult<()> {
        if kind == Some(MethodKind::Constructor) {
            self.constructors += 1;
            if self.constructors > 1 {
                return Err(JsError::parse("A class may only have one constructor", position));
            }
            return Ok(());
        }
        let Some(name) = name else {
            return Ok(());
        };
        if name.starts_with('#') {
            if name == "#constructor" {
                return Err(JsError::parse(
                    "Classes may not have a private field named '#constructor'",
                    position,
                ));
            }
            for (seen, seen_kind) in &self.private {
                if seen != name {
                    continue;
                }
                let accessor_pair = matches!(
                    (seen_kind, kind),
                    (Some(MethodKind::Get), Some(MethodKind::Set))
                        | (Some(MethodKind::Set), Some(MethodKind::Get))
                );
                if !accessor_pair {
                    return Err(JsError::parse(
                        format!("Identifier '{}' has already been declared", name),
                        position,
                    ));
                }
            }
            self.private.push((name.to_string(), kind));
        } else if is_static {
            if name == "prototype" {
                return Err(JsError::parse(
                    "Classes may not have a static property named 'prototype'",
                    position,
                ));
            }
            self.statics.push(name.to_string());
        } else {
            if kind.is_none() && name == "constructor" {
                return Err(JsError::parse(
                    "Classes may not have a field named 'constructor'",
                    position,
                ));
            }
            self.public.push(name.to_string());
        }
        Ok(())
    }
}

/// `get`/`set` prefix of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accessor {
    Get,
    Set,
}

struct PropertyKey {
    node: ExprNode,
    computed: bool,
    /// Static name, `None` when computed
    name: Option<String>,
}

/// Parser over a token stream that always ends in `Eof`.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Tokenize `source` and create a parser over it.
    pub fn new(source: &str) -> JsResult<Self> {
        Ok(Self::from_tokens(Lexer::new(source).tokenize()?))
    }

    /// Create a parser over already lexed tokens.
    pub(crate) fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, position, false));
        }
        Self { tokens, current: 0 }
    }

    /// Number of tokens consumed so far.
    pub(crate) fn position(&self) -> usize {
        self.current
    }

    /// Parse the whole input as a program.
    pub fn parse_program(&mut self) -> JsResult<ExprNode> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Node::new(Program { body }))
    }

    /// Parse the whole input as one expression, allowing a trailing `;`.
    pub fn parse_expression(&mut self) -> JsResult<ExprNode> {
        let mut window: Vec<Token> = self.tokens[self.current..]
            .iter()
            .take_while(|t| !t.is_eof())
            .cloned()
            .collect();
        if window.last().is_some_and(|t| t.is_punct(Punctuator::Semicolon)) {
            window.pop();
        }
        let end = self.tokens[self.tokens.len() - 1].position;
        self.current = self.tokens.len() - 1;
        parse_window(&window, end)
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) {
        if !self.peek().is_eof() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    fn check_punctuator(&self, punct: Punctuator) -> bool {
        self.peek().is_punct(punct)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn eat_punctuator(&mut self, punct: Punctuator) -> bool {
        let found = self.check_punctuator(punct);
        if found {
            self.advance();
        }
        found
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let found = self.check_keyword(keyword);
        if found {
            self.advance();
        }
        found
    }

    fn expect_punctuator(&mut self, punct: Punctuator) -> JsResult<()> {
        if self.eat_punctuator(punct) {
            Ok(())
        } else {
            Err(self.expected(punct.as_str()))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> JsResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.expected(keyword.as_str()))
        }
    }

    fn expected(&self, what: &str) -> JsError {
        let token = self.peek();
        JsError::parse(
            format!("Unexpected {}, expected '{}'", token.describe(), what),
            token.position,
        )
    }

    /// Contextual keyword such as `static` or `get` used as a modifier: the
    /// word is followed by something that can start a member name.
    fn check_modifier(&self, word: &str) -> bool {
        if !self.peek().is_word(word) {
            return false;
        }
        let next = self.peek_at(1);
        !(next.is_eof()
            || next.is_punct(Punctuator::LParen)
            || next.is_punct(Punctuator::Assign)
            || next.is_punct(Punctuator::Semicolon)
            || next.is_punct(Punctuator::RBrace)
            || next.is_punct(Punctuator::Comma)
            || next.is_punct(Punctuator::Colon))
    }

    /// Statement terminator, with automatic insertion before `}`, at end
    /// of input and after a line break.
    fn consume_semicolon(&mut self) -> JsResult<()> {
        if self.eat_punctuator(Punctuator::Semicolon)
            || self.check_punctuator(Punctuator::RBrace)
            || self.is_at_end()
            || self.peek().newline_before
        {
            return Ok(());
        }
        Err(unexpected(self.peek()))
    }

    /// Take tokens up to (not including) the first top-level token matching
    /// `stop`, an unmatched closer, or a line break that ends the statement.
    fn collect(&mut self, mut stop: impl FnMut(&Token) -> bool) -> JsResult<Vec<Token>> {
        let mut depth = 0usize;
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let token = self.peek();
            if token.is_eof() {
                break;
            }
            if depth == 0 {
                if token.is_closer() || stop(token) {
                    break;
                }
                let ends_statement = token.newline_before
                    && token.starts_statement()
                    && tokens.last().is_some_and(Token::ends_operand);
                if ends_statement {
                    break;
                }
            }
            if token.is_opener() {
                depth += 1;
            } else if token.is_closer() {
                depth -= 1;
            }
            tokens.push(token.clone());
            self.current += 1;
        }
        if depth > 0 {
            return Err(JsError::parse("Unexpected end of input", self.peek().position));
        }
        Ok(tokens)
    }

    /// Collect an expression window and reduce it.
    fn expression_until(&mut self, stop: impl FnMut(&Token) -> bool) -> JsResult<ExprNode> {
        let position = self.peek().position;
        let tokens = self.collect(stop)?;
        parse_window(&tokens, position)
    }

    /// Take the tokens between a bracket pair, consuming both brackets.
    fn collect_group(&mut self, open: Punctuator) -> JsResult<Vec<Token>> {
        if !self.check_punctuator(open) {
            return Err(self.expected(open.as_str()));
        }
        let close = matching(&self.tokens, self.current)?;
        let inner = self.tokens[self.current + 1..close].to_vec();
        self.current = close + 1;
        Ok(inner)
    }

    /// `( expression )`
    fn parenthesized(&mut self) -> JsResult<ExprNode> {
        let position = self.peek().position;
        let tokens = self.collect_group(Punctuator::LParen)?;
        parse_window(&tokens, position)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> JsResult<ExprNode> {
        let _level = nesting::enter(self.peek().position)?;
        let token = self.peek();
        let position = token.position;
        match &token.kind {
            TokenKind::Punctuator(Punctuator::LBrace) => self.parse_block(),
            TokenKind::Punctuator(Punctuator::Semicolon) => {
                self.advance();
                Ok(Node::new(EmptyStatement))
            }
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const) => {
                let declaration = self.parse_variable_declaration(false)?;
                self.consume_semicolon()?;
                Ok(declaration)
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function(FunctionForm::Declaration, false),
            TokenKind::Keyword(Keyword::Class) => self.parse_class(true),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                let test = self.parenthesized()?;
                let body = self.parse_statement()?;
                Ok(Node::new(WhileStatement { test, body }))
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance();
                let body = self.parse_statement()?;
                self.expect_keyword(Keyword::While)?;
                let test = self.parenthesized()?;
                self.eat_punctuator(Punctuator::Semicolon);
                Ok(Node::new(DoWhileStatement { body, test }))
            }
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                if self.peek().newline_before {
                    return Err(JsError::parse("Illegal newline after throw", position));
                }
                let argument = self.expression_until(|t| t.is_punct(Punctuator::Semicolon))?;
                self.consume_semicolon()?;
                Ok(Node::new(ThrowStatement { argument }))
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let next = self.peek();
                let bare = next.newline_before
                    || next.is_eof()
                    || next.is_punct(Punctuator::Semicolon)
                    || next.is_punct(Punctuator::RBrace);
                let argument = if bare {
                    None
                } else {
                    Some(self.expression_until(|t| t.is_punct(Punctuator::Semicolon))?)
                };
                self.consume_semicolon()?;
                Ok(Node::new(ReturnStatement { argument }))
            }
            TokenKind::Keyword(keyword @ (Keyword::Break | Keyword::Continue)) => {
                let is_break = *keyword == Keyword::Break;
                self.advance();
                let label = match self.peek().identifier() {
                    Some(name) if !self.peek().newline_before => Some(name.to_string()),
                    _ => None,
                };
                if label.is_some() {
                    self.advance();
                }
                self.consume_semicolon()?;
                Ok(if is_break {
                    Node::new(BreakStatement { label })
                } else {
                    Node::new(ContinueStatement { label })
                })
            }
            TokenKind::Identifier(name)
                if name == "async"
                    && self.peek_at(1).is_keyword(Keyword::Function)
                    && !self.peek_at(1).newline_before =>
            {
                self.advance();
                self.parse_function(FunctionForm::Declaration, true)
            }
            TokenKind::Identifier(name) if self.peek_at(1).is_punct(Punctuator::Colon) => {
                let label = name.clone();
                self.current += 2;
                let body = self.parse_statement()?;
                Ok(Node::new(LabeledStatement { label, body }))
            }
            _ => {
                let expression = self.expression_until(|t| t.is_punct(Punctuator::Semicolon))?;
                self.consume_semicolon()?;
                Ok(Node::new(ExpressionStatement { expression }))
            }
        }
    }

    /// `{ statements }`
    pub(crate) fn parse_block(&mut self) -> JsResult<ExprNode> {
        let body = self.parse_block_body()?;
        Ok(Node::new(BlockStatement { body }))
    }

    fn parse_block_body(&mut self) -> JsResult<Vec<ExprNode>> {
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut body = Vec::new();
        while !self.eat_punctuator(Punctuator::RBrace) {
            if self.is_at_end() {
                return Err(self.expected("}"));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    /// `var`/`let`/`const` with one or more declarators. Inside a `for`
    /// head the declarators stop before `in`/`of` and `const` may lack an
    /// initializer.
    fn parse_variable_declaration(&mut self, in_for_head: bool) -> JsResult<ExprNode> {
        let kind = match self.peek().kind {
            TokenKind::Keyword(Keyword::Var) => DeclarationKind::Var,
            TokenKind::Keyword(Keyword::Let) => DeclarationKind::Let,
            _ => DeclarationKind::Const,
        };
        self.advance();
        let mut declarations = Vec::new();
        loop {
            let position = self.peek().position;
            let target = self.expression_until(|t| {
                t.is_punct(Punctuator::Assign)
                    || t.is_punct(Punctuator::Comma)
                    || t.is_punct(Punctuator::Semicolon)
                    || t.is_keyword(Keyword::In)
                    || t.is_word("of")
            })?;
            let id = to_pattern(&target, true, position)?;
            let init = if self.eat_punctuator(Punctuator::Assign) {
                Some(self.expression_until(|t| {
                    t.is_punct(Punctuator::Comma) || t.is_punct(Punctuator::Semicolon)
                })?)
            } else {
                None
            };
            let for_in_of = in_for_head && (self.check_keyword(Keyword::In) || self.peek().is_word("of"));
            if init.is_none() && !for_in_of {
                if kind == DeclarationKind::Const {
                    return Err(JsError::parse("Missing initializer in const declaration", position));
                }
                if !matches!(*id, Node::Identifier(_)) {
                    return Err(JsError::parse(
                        "Missing initializer in destructuring declaration",
                        position,
                    ));
                }
            }
            declarations.push(Node::new(VariableDeclarator { id, init }));
            if !self.eat_punctuator(Punctuator::Comma) {
                break;
            }
        }
        Ok(Node::new(VariableDeclaration { kind, declarations }))
    }

    fn parse_if(&mut self) -> JsResult<ExprNode> {
        self.advance();
        let test = self.parenthesized()?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat_keyword(Keyword::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(Node::new(IfStatement { test, consequent, alternate }))
    }

    /// `for (init; test; update)`, `for (x of y)`, `for (k in o)` and
    /// `for await (x of y)`.
    fn parse_for(&mut self) -> JsResult<ExprNode> {
        let position = self.peek().position;
        self.advance();
        let is_await = self.eat_keyword(Keyword::Await);
        if !self.check_punctuator(Punctuator::LParen) {
            return Err(self.expected("("));
        }
        let close = matching(&self.tokens, self.current)?;
        let classic = has_top_level(&self.tokens[self.current + 1..close], Punctuator::Semicolon);
        self.advance();

        if classic {
            if is_await {
                return Err(JsError::parse("'for await' requires an 'of' clause", position));
            }
            let init = if self.check_punctuator(Punctuator::Semicolon) {
                None
            } else if matches!(
                self.peek().kind,
                TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const)
            ) {
                Some(self.parse_variable_declaration(false)?)
            } else {
                Some(self.expression_until(|t| t.is_punct(Punctuator::Semicolon))?)
            };
            self.expect_punctuator(Punctuator::Semicolon)?;
            let test = if self.check_punctuator(Punctuator::Semicolon) {
                None
            } else {
                Some(self.expression_until(|t| t.is_punct(Punctuator::Semicolon))?)
            };
            self.expect_punctuator(Punctuator::Semicolon)?;
            let update = if self.check_punctuator(Punctuator::RParen) {
                None
            } else {
                Some(self.expression_until(|_| false)?)
            };
            self.expect_punctuator(Punctuator::RParen)?;
            let body = self.parse_statement()?;
            return Ok(Node::new(ForStatement { init, test, update, body }));
        }

        let left = if matches!(
            self.peek().kind,
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const)
        ) {
            self.parse_variable_declaration(true)?
        } else {
            let target_position = self.peek().position;
            let target = self.expression_until(|t| t.is_keyword(Keyword::In) || t.is_word("of"))?;
            to_pattern(&target, false, target_position)?
        };
        let is_in = if self.eat_keyword(Keyword::In) {
            true
        } else if self.peek().is_word("of") {
            self.advance();
            false
        } else {
            return Err(self.expected("of"));
        };
        if is_in && is_await {
            return Err(JsError::parse("'for await' requires an 'of' clause", position));
        }
        let right = self.expression_until(|_| false)?;
        self.expect_punctuator(Punctuator::RParen)?;
        let body = self.parse_statement()?;
        Ok(match (is_in, is_await) {
            (true, _) => Node::new(ForInStatement { left, right, body }),
            (false, true) => Node::new(ForAwaitStatement { left, right, body }),
            (false, false) => Node::new(ForOfStatement { left, right, body }),
        })
    }

    fn parse_switch(&mut self) -> JsResult<ExprNode> {
        self.advance();
        let discriminant = self.parenthesized()?;
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.eat_punctuator(Punctuator::RBrace) {
            let position = self.peek().position;
            let test = if self.eat_keyword(Keyword::Case) {
                // Colons of nested conditionals belong to their `?`
                let mut pending = 0usize;
                Some(self.expression_until(|t| {
                    if t.is_punct(Punctuator::Question) {
                        pending += 1;
                    } else if t.is_punct(Punctuator::Colon) {
                        if pending == 0 {
                            return true;
                        }
                        pending -= 1;
                    }
                    false
                })?)
            } else if self.eat_keyword(Keyword::Default) {
                if seen_default {
                    return Err(JsError::parse(
                        "More than one default clause in switch statement",
                        position,
                    ));
                }
                seen_default = true;
                None
            } else {
                return Err(unexpected(self.peek()));
            };
            self.expect_punctuator(Punctuator::Colon)?;
            let mut consequent = Vec::new();
            while !(self.check_keyword(Keyword::Case)
                || self.check_keyword(Keyword::Default)
                || self.check_punctuator(Punctuator::RBrace)
                || self.is_at_end())
            {
                consequent.push(self.parse_statement()?);
            }
            cases.push(Node::new(SwitchCase { test, consequent }));
        }
        Ok(Node::new(SwitchStatement { discriminant, cases }))
    }

    fn parse_try(&mut self) -> JsResult<ExprNode> {
        let position = self.peek().position;
        self.advance();
        let block = self.parse_block()?;
        let handler = if self.eat_keyword(Keyword::Catch) {
            let param = if self.check_punctuator(Punctuator::LParen) {
                let param_position = self.peek().position;
                let target = self.parenthesized()?;
                Some(to_pattern(&target, true, param_position)?)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(Node::new(CatchClause { param, body }))
        } else {
            None
        };
        let finalizer = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(JsError::parse("Missing catch or finally after try", position));
        }
        Ok(Node::new(TryStatement { block, handler, finalizer }))
    }

    // ------------------------------------------------------------------
    // Functions, classes and object literals
    // ------------------------------------------------------------------

    /// `function name(params) { body }`, with `*` for generators. The
    /// `async` prefix, if any, has already been consumed.
    pub(crate) fn parse_function(&mut self, form: FunctionForm, is_async: bool) -> JsResult<ExprNode> {
        let position = self.peek().position;
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat_punctuator(Punctuator::Star);
        let name = match self.peek().identifier() {
            Some(name) => {
                let name = name.to_string();
                self.advance();
                name
            }
            None if form == FunctionForm::Declaration => {
                return Err(JsError::parse("Function statements require a function name", position))
            }
            None => String::new(),
        };
        let def = self.parse_function_rest(name, form, is_async, is_generator)?;
        Ok(Node::new(Function { def: Rc::new(def) }))
    }

    /// Parameter list and body.
    fn parse_function_rest(
        &mut self,
        name: String,
        form: FunctionForm,
        is_async: bool,
        is_generator: bool,
    ) -> JsResult<FunctionDef> {
        let position = self.peek().position;
        let params_tokens = self.collect_group(Punctuator::LParen)?;
        let params = parse_params(&params_tokens, position)?;
        let body = self.parse_block()?;
        Ok(FunctionDef {
            name,
            params,
            body,
            form,
            is_async,
            is_generator,
        })
    }

    /// `async`, `*` and `get`/`set` in front of a method name.
    fn parse_method_modifiers(&mut self) -> (bool, bool, Option<Accessor>) {
        let is_async = self.check_modifier("async") && !self.peek_at(1).newline_before;
        if is_async {
            self.advance();
        }
        let is_generator = self.eat_punctuator(Punctuator::Star);
        let mut accessor = None;
        if !is_async && !is_generator {
            if self.check_modifier("get") {
                accessor = Some(Accessor::Get);
            } else if self.check_modifier("set") {
                accessor = Some(Accessor::Set);
            }
            if accessor.is_some() {
                self.advance();
            }
        }
        (is_async, is_generator, accessor)
    }

    fn parse_property_key(&mut self) -> JsResult<PropertyKey> {
        let token = self.peek();
        let (node, name) = match &token.kind {
            TokenKind::Identifier(name) => (Node::new(Identifier { name: name.clone() }), name.clone()),
            TokenKind::Keyword(keyword) => {
                let name = keyword.as_str().to_string();
                (Node::new(Identifier { name: name.clone() }), name)
            }
            TokenKind::PrivateName(name) => {
                let name = format!("#{}", name);
                (Node::new(Identifier { name: name.clone() }), name)
            }
            TokenKind::String { value, quote } => (
                Node::new(StringLiteral {
                    value: value.clone(),
                    quote: *quote,
                }),
                value.clone(),
            ),
            TokenKind::Number { value, raw } => (
                Node::new(NumberLiteral {
                    value: *value,
                    raw: Some(raw.clone()),
                }),
                number_to_string(*value),
            ),
            TokenKind::Punctuator(Punctuator::LBracket) => {
                let position = token.position;
                let tokens = self.collect_group(Punctuator::LBracket)?;
                return Ok(PropertyKey {
                    node: parse_window(&tokens, position)?,
                    computed: true,
                    name: None,
                });
            }
            _ => return Err(unexpected(token)),
        };
        self.advance();
        Ok(PropertyKey {
            node,
            computed: false,
            name: Some(name),
        })
    }

    /// `{ a, b: 1, ...rest, m() {}, get x() {} }`
    pub(crate) fn parse_object_literal(&mut self) -> JsResult<ExprNode> {
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut properties = Vec::new();
        while !self.eat_punctuator(Punctuator::RBrace) {
            properties.push(self.parse_object_member()?);
            if !self.eat_punctuator(Punctuator::Comma) {
                self.expect_punctuator(Punctuator::RBrace)?;
                break;
            }
        }
        Ok(Node::new(ObjectExpression { properties }))
    }

    fn parse_object_member(&mut self) -> JsResult<ExprNode> {
        if self.eat_punctuator(Punctuator::Spread) {
            let argument = self.expression_until(|t| t.is_punct(Punctuator::Comma))?;
            return Ok(Node::new(SpreadElement { argument }));
        }
        let start = self.peek().clone();
        let (is_async, is_generator, accessor) = self.parse_method_modifiers();
        let key = self.parse_property_key()?;

        if self.check_punctuator(Punctuator::LParen) {
            let name = key.name.clone().unwrap_or_default();
            let def = self.parse_function_rest(name, FunctionForm::Method, is_async, is_generator)?;
            let kind = match accessor {
                Some(Accessor::Get) => PropertyKind::Get,
                Some(Accessor::Set) => PropertyKind::Set,
                None => PropertyKind::Init,
            };
            return Ok(Node::new(Property {
                key: key.node,
                computed: key.computed,
                value: Node::new(Function { def: Rc::new(def) }),
                kind,
                shorthand: false,
                method: accessor.is_none(),
            }));
        }
        if is_async || is_generator || accessor.is_some() {
            return Err(unexpected(self.peek()));
        }

        if self.eat_punctuator(Punctuator::Colon) {
            let value = self.expression_until(|t| t.is_punct(Punctuator::Comma))?;
            return Ok(Node::new(Property {
                key: key.node,
                computed: key.computed,
                value,
                kind: PropertyKind::Init,
                shorthand: false,
                method: false,
            }));
        }

        // Shorthand `{ name }` or, in patterns, `{ name = fallback }`
        let shorthand = !key.computed && matches!(start.kind, TokenKind::Identifier(_));
        if !shorthand {
            return Err(unexpected(self.peek()));
        }
        let value = if self.eat_punctuator(Punctuator::Assign) {
            let fallback = self.expression_until(|t| t.is_punct(Punctuator::Comma))?;
            Node::new(AssignmentExpression {
                operator: "=".to_string(),
                left: key.node.clone(),
                right: fallback,
            })
        } else {
            key.node.clone()
        };
        Ok(Node::new(Property {
            key: key.node,
            computed: false,
            value,
            kind: PropertyKind::Init,
            shorthand: true,
            method: false,
        }))
    }

    /// `class Name extends Base { members }`
    pub(crate) fn parse_class(&mut self, declaration: bool) -> JsResult<ExprNode> {
        let position = self.peek().position;
        self.expect_keyword(Keyword::Class)?;
        let name = match self.peek().identifier() {
            Some(name) => {
                let name = name.to_string();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        if declaration && name.is_none() {
            return Err(JsError::parse("Class statements require a class name", position));
        }
        let super_class = if self.eat_keyword(Keyword::Extends) {
            Some(self.expression_until(|t| t.is_punct(Punctuator::LBrace))?)
        } else {
            None
        };
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut info = ClassInfo::default();
        let mut members = Vec::new();
        while !self.eat_punctuator(Punctuator::RBrace) {
            if self.eat_punctuator(Punctuator::Semicolon) {
                continue;
            }
            if self.is_at_end() {
                return Err(self.expected("}"));
            }
            members.push(self.parse_class_member(&mut info)?);
        }
        Ok(Node::new(Class {
            name,
            super_class,
            members,
            declaration,
        }))
    }

    fn parse_class_member(&mut self, info: &mut ClassInfo) -> JsResult<ExprNode> {
        let position = self.peek().position;
        let is_static = self.check_modifier("static");
        if is_static {
            self.advance();
            if self.check_punctuator(Punctuator::LBrace) {
                let body = self.parse_block_body()?;
                return Ok(Node::new(StaticBlock { body }));
            }
        }
        let (is_async, is_generator, accessor) = self.parse_method_modifiers();
        let key = self.parse_property_key()?;
        let tracked = if key.computed { None } else { key.name.as_deref() };

        if self.check_punctuator(Punctuator::LParen) {
            let is_constructor = !is_static && tracked == Some("constructor");
            let kind = match accessor {
                _ if is_constructor => {
                    if is_async || is_generator || accessor.is_some() {
                        return Err(JsError::parse(
                            "Class constructor may not be an accessor, async or a generator",
                            position,
                        ));
                    }
                    MethodKind::Constructor
                }
                Some(Accessor::Get) => MethodKind::Get,
                Some(Accessor::Set) => MethodKind::Set,
                None => MethodKind::Method,
            };
            info.record(tracked, is_static, Some(kind), position)?;
            let name = key.name.clone().unwrap_or_default();
            let def = self.parse_function_rest(name, FunctionForm::Method, is_async, is_generator)?;
            return Ok(Node::new(MethodDefinition {
                key: key.node,
                computed: key.computed,
                value: Node::new(Function { def: Rc::new(def) }),
                kind,
                is_static,
            }));
        }
        if is_async || is_generator || accessor.is_some() {
            return Err(unexpected(self.peek()));
        }

        info.record(tracked, is_static, None, position)?;
        let value = if self.eat_punctuator(Punctuator::Assign) {
            Some(self.expression_until(|t| t.is_punct(Punctuator::Semicolon))?)
        } else {
            None
        };
        self.consume_semicolon()?;
        Ok(Node::new(PropertyDefinition {
            key: key.node,
            computed: key.computed,
            value,
            is_static,
        }))
    }
}
