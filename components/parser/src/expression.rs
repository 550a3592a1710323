//! Expression parser - reduces a token window to a single expression.
//!
//! The window is rewritten in place by passes in strict precedence order.
//! The primary pass turns literals, identifiers, groups, array and object
//! literals, functions, classes and templates into EXPRESSION tokens. A
//! `(` or `[` directly after an expression is a "false open": it becomes an
//! argument list or an index instead of a group or an array. Every later
//! pass finds its operators, checks that the required operands are already
//! expressions and splices `[left, op, right]` into one EXPRESSION token.
//! Whatever is left at the end must be exactly one expression.

use crate::nesting;
use crate::parser::Parser;
use crate::token::{Keyword, Precedence, Punctuator, Template, Token, TokenKind};
use core_types::{JsError, JsResult, SourcePosition};
use interpreter::node::{
    ArrayExpression, ArrayPattern, AssignmentExpression, AssignmentPattern, AwaitExpression,
    BigIntLiteral, BinaryExpression, BooleanLiteral, CallExpression, ConditionalExpression,
    Function, Identifier, LogicalExpression, MemberExpression, NewExpression, NullLiteral,
    NumberLiteral, ObjectPattern, ParenthesizedExpression, PipelineExpression, Property,
    PropertyKind, RegExpLiteral, RestElement, SequenceExpression, SpreadElement, StringLiteral,
    SuperCall, SuperMember, TaggedTemplateExpression, TemplateLiteral, ThisExpression,
    UnaryExpression, UpdateExpression, YieldExpression,
};
use interpreter::{ExprNode, FunctionDef, FunctionForm, Node};
use std::rc::Rc;

/// Parse a token window holding exactly one expression. `end` locates
/// errors for an empty window.
pub(crate) fn parse_window(tokens: &[Token], end: SourcePosition) -> JsResult<ExprNode> {
    if tokens.is_empty() {
        return Err(JsError::parse("Expected an expression", end));
    }
    let _level = nesting::enter(tokens[0].position)?;
    let mut reducer = Reducer {
        items: primary_pass(tokens)?,
    };
    reducer.reduce_access()?;
    reducer.reduce_update()?;
    reducer.reduce_unary()?;
    reducer.reduce_exponent()?;
    for level in [
        Precedence::Multiplicative,
        Precedence::Additive,
        Precedence::Shift,
        Precedence::Relational,
        Precedence::Equality,
        Precedence::BitwiseAnd,
        Precedence::BitwiseXor,
        Precedence::BitwiseOr,
        Precedence::LogicalAnd,
        Precedence::LogicalOr,
        Precedence::Nullish,
    ] {
        reducer.reduce_binary(level)?;
    }
    reducer.reduce_pipeline()?;
    reducer.reduce_conditional()?;
    reducer.reduce_assignment()?;
    reducer.reduce_sequence()?;
    reducer.finish()
}

/// Parse a parameter list (the tokens between the parentheses).
pub(crate) fn parse_params(tokens: &[Token], end: SourcePosition) -> JsResult<Vec<ExprNode>> {
    let segments = split_commas(tokens);
    let count = segments.len();
    let mut params = Vec::with_capacity(count);
    for (index, segment) in segments.into_iter().enumerate() {
        let last = index + 1 == count;
        match segment.first() {
            None if last && index > 0 => {}
            None => return Err(JsError::parse("Unexpected token ','", end)),
            Some(first) if first.is_punct(Punctuator::Spread) => {
                if !last {
                    return Err(JsError::parse(
                        "Rest parameter must be last formal parameter",
                        first.position,
                    ));
                }
                let argument = parse_window(&segment[1..], first.position)?;
                params.push(Node::new(RestElement {
                    argument: to_pattern(&argument, true, first.position)?,
                }));
            }
            Some(first) => {
                let param = parse_window(segment, first.position)?;
                params.push(to_pattern(&param, true, first.position)?);
            }
        }
    }
    Ok(params)
}

/// Turn an expression into an assignment target.
///
/// Array and object literals become patterns and `x = d` becomes a default.
/// With `binding` set (declarations, parameters, catch clauses) only names
/// and patterns are accepted; plain assignment also accepts any other node
/// and leaves the not-assignable failure to evaluation.
pub(crate) fn to_pattern(target: &ExprNode, binding: bool, position: SourcePosition) -> JsResult<ExprNode> {
    match &**target {
        Node::Identifier(_)
        | Node::ObjectPattern(_)
        | Node::ArrayPattern(_)
        | Node::AssignmentPattern(_)
        | Node::RestElement(_) => Ok(target.clone()),
        Node::ArrayExpression(array) => {
            let elements = array
                .elements
                .iter()
                .map(|element| {
                    element
                        .as_ref()
                        .map(|element| to_pattern(element, binding, position))
                        .transpose()
                })
                .collect::<JsResult<Vec<_>>>()?;
            Ok(Node::new(ArrayPattern { elements }))
        }
        Node::ObjectExpression(object) => {
            let properties = object
                .properties
                .iter()
                .map(|property| match &**property {
                    Node::Property(p) if p.kind == PropertyKind::Init && !p.method => Ok(Node::new(Property {
                        key: p.key.clone(),
                        computed: p.computed,
                        value: to_pattern(&p.value, binding, position)?,
                        kind: PropertyKind::Init,
                        shorthand: p.shorthand,
                        method: false,
                    })),
                    Node::SpreadElement(spread) => Ok(Node::new(RestElement {
                        argument: to_pattern(&spread.argument, binding, position)?,
                    })),
                    _ => Err(JsError::parse("Invalid destructuring assignment target", position)),
                })
                .collect::<JsResult<Vec<_>>>()?;
            Ok(Node::new(ObjectPattern { properties }))
        }
        Node::AssignmentExpression(assignment) if assignment.operator == "=" => {
            Ok(Node::new(AssignmentPattern {
                left: to_pattern(&assignment.left, binding, position)?,
                right: assignment.right.clone(),
            }))
        }
        Node::SpreadElement(spread) => Ok(Node::new(RestElement {
            argument: to_pattern(&spread.argument, binding, position)?,
        })),
        Node::ParenthesizedExpression(group) if !binding => to_pattern(&group.expression, binding, position),
        _ if binding => Err(JsError::parse("Invalid destructuring assignment target", position)),
        _ => Ok(target.clone()),
    }
}

/// Split at commas outside any brackets.
pub(crate) fn split_commas(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_opener() {
            depth += 1;
        } else if token.is_closer() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(Punctuator::Comma) {
            segments.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    segments.push(&tokens[start..]);
    segments
}

/// True if `punct` occurs outside any brackets.
pub(crate) fn has_top_level(tokens: &[Token], punct: Punctuator) -> bool {
    let mut depth = 0usize;
    for token in tokens {
        if token.is_opener() {
            depth += 1;
        } else if token.is_closer() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(punct) {
            return true;
        }
    }
    false
}

/// Index of the bracket closing the one at `open`.
pub(crate) fn matching(tokens: &[Token], open: usize) -> JsResult<usize> {
    let mut expected = Vec::new();
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match &token.kind {
            TokenKind::Punctuator(Punctuator::LParen) => expected.push(Punctuator::RParen),
            TokenKind::Punctuator(Punctuator::LBracket) => expected.push(Punctuator::RBracket),
            TokenKind::Punctuator(Punctuator::LBrace) => expected.push(Punctuator::RBrace),
            TokenKind::Punctuator(p @ (Punctuator::RParen | Punctuator::RBracket | Punctuator::RBrace)) => {
                if expected.pop() != Some(*p) {
                    return Err(unexpected(token));
                }
                if expected.is_empty() {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    let opener = &tokens[open];
    Err(JsError::parse(
        format!("Unexpected end of input, unclosed {}", opener.describe()),
        opener.position,
    ))
}

pub(crate) fn unexpected(token: &Token) -> JsError {
    JsError::parse(format!("Unexpected {}", token.describe()), token.position)
}

/// True if a `(` or `[` here continues the previous item.
fn continues_operand(last: Option<&Token>) -> bool {
    last.is_some_and(|token| {
        matches!(
            token.kind,
            TokenKind::Expression(_)
                | TokenKind::Arguments(_)
                | TokenKind::Index(_)
                | TokenKind::Quasi(_)
                | TokenKind::Punctuator(Punctuator::OptionalChain)
        )
    })
}

fn member_name(token: &Token) -> Option<String> {
    match &token.kind {
        TokenKind::Identifier(name) => Some(name.clone()),
        TokenKind::Keyword(keyword) => Some(keyword.as_str().to_string()),
        TokenKind::PrivateName(name) => Some(format!("#{}", name)),
        _ => None,
    }
}

fn identifier(name: impl Into<String>) -> ExprNode {
    Node::new(Identifier { name: name.into() })
}

fn template(template: &Template, position: SourcePosition) -> JsResult<ExprNode> {
    let expressions = template
        .substitutions
        .iter()
        .map(|tokens| parse_window(tokens, position))
        .collect::<JsResult<Vec<_>>>()?;
    Ok(Node::new(TemplateLiteral {
        quasis: template.quasis.clone(),
        raws: template.raws.clone(),
        expressions,
    }))
}

fn emit(out: &mut Vec<Token>, position: SourcePosition, node: ExprNode) {
    out.push(Token::expression(node, position));
}

/// Elements of an array literal; empty slots are holes.
fn array_elements(tokens: &[Token]) -> JsResult<Vec<Option<ExprNode>>> {
    let mut segments = split_commas(tokens);
    if segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments
        .into_iter()
        .map(|segment| match segment.first() {
            None => Ok(None),
            Some(first) => element(segment, first.position).map(Some),
        })
        .collect()
}

/// Call arguments; only a trailing comma may be empty.
fn arguments(tokens: &[Token], end: SourcePosition) -> JsResult<Vec<ExprNode>> {
    let segments = split_commas(tokens);
    let count = segments.len();
    let mut args = Vec::with_capacity(count);
    for (index, segment) in segments.into_iter().enumerate() {
        match segment.first() {
            None if index + 1 == count && index > 0 => {}
            None => return Err(JsError::parse("Unexpected token ','", end)),
            Some(first) => args.push(element(segment, first.position)?),
        }
    }
    Ok(args)
}

/// One list element, with `...spread` support.
fn element(segment: &[Token], position: SourcePosition) -> JsResult<ExprNode> {
    if segment[0].is_punct(Punctuator::Spread) {
        Ok(Node::new(SpreadElement {
            argument: parse_window(&segment[1..], position)?,
        }))
    } else {
        parse_window(segment, position)
    }
}

/// Where a concise arrow body ends: the next top-level comma.
fn concise_body_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        if token.is_opener() {
            depth += 1;
        } else if token.is_closer() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(Punctuator::Comma) {
            return i;
        }
    }
    tokens.len()
}

/// Build an arrow function whose `=>` is at `arrow`; returns the node and
/// the index after its body.
fn arrow_function(
    tokens: &[Token],
    params: Vec<ExprNode>,
    arrow: usize,
    is_async: bool,
) -> JsResult<(ExprNode, usize)> {
    let start = arrow + 1;
    let (body, next) = match tokens.get(start) {
        Some(token) if token.is_punct(Punctuator::LBrace) => {
            let close = matching(tokens, start)?;
            let mut parser = Parser::from_tokens(tokens[start..=close].to_vec());
            (parser.parse_block()?, close + 1)
        }
        Some(token) => {
            let end = concise_body_end(tokens, start);
            (parse_window(&tokens[start..end], token.position)?, end)
        }
        None => {
            return Err(JsError::parse(
                "Expected arrow function body",
                tokens[arrow].position,
            ))
        }
    };
    let def = FunctionDef {
        name: String::new(),
        params,
        body,
        form: FunctionForm::Arrow,
        is_async,
        is_generator: false,
    };
    Ok((Node::new(Function { def: Rc::new(def) }), next))
}

/// Try `(params) =>` or `name =>` at `at`; returns the arrow and the
/// index after it.
fn try_arrow(tokens: &[Token], at: usize, is_async: bool) -> JsResult<Option<(ExprNode, usize)>> {
    let token = &tokens[at];
    match &token.kind {
        TokenKind::Identifier(name) => {
            if tokens.get(at + 1).is_some_and(|t| t.is_punct(Punctuator::Arrow)) {
                let (function, next) = arrow_function(tokens, vec![identifier(name.clone())], at + 1, is_async)?;
                return Ok(Some((function, next)));
            }
            Ok(None)
        }
        TokenKind::Punctuator(Punctuator::LParen) => {
            let close = matching(tokens, at)?;
            if !tokens.get(close + 1).is_some_and(|t| t.is_punct(Punctuator::Arrow)) {
                return Ok(None);
            }
            let params = parse_params(&tokens[at + 1..close], tokens[close].position)?;
            let (function, next) = arrow_function(tokens, params, close + 1, is_async)?;
            Ok(Some((function, next)))
        }
        _ => Ok(None),
    }
}

/// Reduce primaries and bracketed constructs to EXPRESSION tokens.
fn primary_pass(tokens: &[Token]) -> JsResult<Vec<Token>> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut measured = 0;
    let mut mark = nesting::mark();
    let mut i = 0;
    while i < tokens.len() {
        settle_depths(&mut out, &mut measured, &mut mark);
        let token = &tokens[i];
        let position = token.position;
        let after_operand = continues_operand(out.last());

        match &token.kind {
            TokenKind::Number { value, raw } => emit(&mut out, position, Node::new(NumberLiteral {
                value: *value,
                raw: Some(raw.clone()),
            })),
            TokenKind::BigInt(value) => emit(&mut out, position, Node::new(BigIntLiteral { value: value.clone() })),
            TokenKind::String { value, quote } => emit(&mut out, position, Node::new(StringLiteral {
                value: value.clone(),
                quote: *quote,
            })),
            TokenKind::RegExp { pattern, flags } => emit(&mut out, position, Node::new(RegExpLiteral {
                pattern: pattern.clone(),
                flags: flags.clone(),
            })),
            TokenKind::Template(parts) => {
                let literal = template(parts, position)?;
                if after_operand {
                    out.push(Token::new(TokenKind::Quasi(literal), position, false));
                } else {
                    emit(&mut out, position, literal);
                }
            }
            TokenKind::Keyword(Keyword::True) => emit(&mut out, position, Node::new(BooleanLiteral { value: true })),
            TokenKind::Keyword(Keyword::False) => emit(&mut out, position, Node::new(BooleanLiteral { value: false })),
            TokenKind::Keyword(Keyword::Null) => emit(&mut out, position, Node::new(NullLiteral)),
            TokenKind::Keyword(Keyword::This) => emit(&mut out, position, Node::new(ThisExpression)),
            TokenKind::Keyword(Keyword::Super) => {
                let (sup, next) = super_expression(tokens, i)?;
                emit(&mut out, position, sup);
                i = next;
                continue;
            }
            TokenKind::Keyword(Keyword::Function) => {
                let mut parser = Parser::from_tokens(tokens[i..].to_vec());
                emit(&mut out, position, parser.parse_function(FunctionForm::Expression, false)?);
                i += parser.position();
                continue;
            }
            TokenKind::Keyword(Keyword::Class) => {
                let mut parser = Parser::from_tokens(tokens[i..].to_vec());
                emit(&mut out, position, parser.parse_class(false)?);
                i += parser.position();
                continue;
            }
            TokenKind::Keyword(Keyword::Yield) => {
                if tokens.get(i + 1).is_some_and(|t| t.is_punct(Punctuator::Star)) {
                    out.push(Token::new(TokenKind::YieldDelegate, position, false));
                    i += 2;
                    continue;
                }
                out.push(token.clone());
            }
            TokenKind::Keyword(
                Keyword::In
                | Keyword::Instanceof
                | Keyword::Typeof
                | Keyword::Void
                | Keyword::Delete
                | Keyword::Await
                | Keyword::New,
            ) => out.push(token.clone()),
            TokenKind::Keyword(_) | TokenKind::PrivateName(_) => return Err(unexpected(token)),
            TokenKind::Identifier(name) => {
                let next = tokens.get(i + 1);
                let same_line = next.is_some_and(|t| !t.newline_before);
                if name == "async" && same_line {
                    if next.is_some_and(|t| t.is_keyword(Keyword::Function)) {
                        let mut parser = Parser::from_tokens(tokens[i + 1..].to_vec());
                        emit(&mut out, position, parser.parse_function(FunctionForm::Expression, true)?);
                        i += 1 + parser.position();
                        continue;
                    }
                    if let Some((function, next)) = try_arrow(tokens, i + 1, true)? {
                        emit(&mut out, position, function);
                        i = next;
                        continue;
                    }
                }
                if let Some((function, next)) = try_arrow(tokens, i, false)? {
                    emit(&mut out, position, function);
                    i = next;
                    continue;
                }
                emit(&mut out, position, identifier(name.clone()));
            }
            TokenKind::Punctuator(punct @ (Punctuator::Dot | Punctuator::OptionalChain)) => {
                out.push(token.clone());
                let name = tokens.get(i + 1).and_then(member_name);
                match name {
                    Some(name) => {
                        let name_position = tokens[i + 1].position;
                        out.push(Token::expression(identifier(name), name_position));
                        i += 2;
                        continue;
                    }
                    None if *punct == Punctuator::OptionalChain
                        && tokens.get(i + 1).is_some_and(|t| {
                            t.is_punct(Punctuator::LParen) || t.is_punct(Punctuator::LBracket)
                        }) => {}
                    None => {
                        return Err(match tokens.get(i + 1) {
                            Some(next) => unexpected(next),
                            None => JsError::parse("Unexpected end of input", position),
                        })
                    }
                }
            }
            TokenKind::Punctuator(Punctuator::LParen) => {
                let close = matching(tokens, i)?;
                let inner = &tokens[i + 1..close];
                if after_operand {
                    let args = arguments(inner, tokens[close].position)?;
                    out.push(Token::new(TokenKind::Arguments(args), position, false));
                    i = close + 1;
                    continue;
                }
                if let Some((function, next)) = try_arrow(tokens, i, false)? {
                    emit(&mut out, position, function);
                    i = next;
                    continue;
                }
                if inner.is_empty() {
                    return Err(unexpected(&tokens[close]));
                }
                let expression = parse_window(inner, tokens[close].position)?;
                emit(&mut out, position, Node::new(ParenthesizedExpression { expression }));
                i = close + 1;
                continue;
            }
            TokenKind::Punctuator(Punctuator::LBracket) => {
                let close = matching(tokens, i)?;
                let inner = &tokens[i + 1..close];
                if after_operand {
                    let key = parse_window(inner, tokens[close].position)?;
                    out.push(Token::new(TokenKind::Index(key), position, false));
                } else {
                    let elements = array_elements(inner)?;
                    emit(&mut out, position, Node::new(ArrayExpression { elements }));
                }
                i = close + 1;
                continue;
            }
            TokenKind::Punctuator(Punctuator::LBrace) => {
                if after_operand {
                    return Err(unexpected(token));
                }
                let close = matching(tokens, i)?;
                let mut parser = Parser::from_tokens(tokens[i..=close].to_vec());
                emit(&mut out, position, parser.parse_object_literal()?);
                i = close + 1;
                continue;
            }
            TokenKind::Punctuator(
                Punctuator::RParen | Punctuator::RBracket | Punctuator::RBrace | Punctuator::Semicolon,
            )
            | TokenKind::Eof => return Err(unexpected(token)),
            _ => out.push(token.clone()),
        }
        i += 1;
    }
    settle_depths(&mut out, &mut measured, &mut mark);
    Ok(out)
}

/// Give the tokens pushed since the last call the depth reached while
/// building them, then start measuring the next ones.
fn settle_depths(out: &mut [Token], measured: &mut usize, mark: &mut usize) {
    let depth = nesting::since(*mark).max(1);
    for token in &mut out[*measured..] {
        token.depth = depth;
    }
    *measured = out.len();
    *mark = nesting::mark();
}

/// `super.name`, `super[key]` or `super(args)` at `at`.
fn super_expression(tokens: &[Token], at: usize) -> JsResult<(ExprNode, usize)> {
    let position = tokens[at].position;
    let fail = || JsError::parse("'super' keyword unexpected here", position);
    let next = tokens.get(at + 1).ok_or_else(fail)?;
    match &next.kind {
        TokenKind::Punctuator(Punctuator::Dot) => {
            let name = tokens.get(at + 2).and_then(member_name).ok_or_else(fail)?;
            Ok((
                Node::new(SuperMember {
                    property: identifier(name),
                    computed: false,
                }),
                at + 3,
            ))
        }
        TokenKind::Punctuator(Punctuator::LBracket) => {
            let close = matching(tokens, at + 1)?;
            let property = parse_window(&tokens[at + 2..close], tokens[close].position)?;
            Ok((Node::new(SuperMember { property, computed: true }), close + 1))
        }
        TokenKind::Punctuator(Punctuator::LParen) => {
            let close = matching(tokens, at + 1)?;
            let args = arguments(&tokens[at + 2..close], tokens[close].position)?;
            Ok((Node::new(SuperCall { arguments: args }), close + 1))
        }
        _ => Err(fail()),
    }
}

/// The working window of the later passes.
struct Reducer {
    items: Vec<Token>,
}

impl Reducer {
    fn node_at(&self, index: usize) -> Option<ExprNode> {
        self.items.get(index).and_then(Token::node).cloned()
    }

    /// Replace `width` items starting at `at` with one expression.
    fn splice(&mut self, at: usize, width: usize, node: ExprNode) -> JsResult<()> {
        let position = self.items[at].position;
        let depth = 1 + self.items[at..at + width].iter().map(|t| t.depth).max().unwrap_or(0);
        nesting::reach(depth, position)?;
        let mut token = Token::expression(node, position);
        token.depth = depth;
        self.items.splice(at..at + width, [token]);
        Ok(())
    }

    /// Operands on both sides of the operator at `index`.
    fn operands(&self, index: usize) -> JsResult<(ExprNode, ExprNode)> {
        let op = &self.items[index];
        let left = index.checked_sub(1).and_then(|l| self.node_at(l));
        let right = self.node_at(index + 1);
        match (left, right) {
            (Some(left), Some(right)) => Ok((left, right)),
            (None, _) => Err(JsError::parse(
                format!("Unexpected {}: missing left operand", op.describe()),
                op.position,
            )),
            (_, None) => Err(JsError::parse(
                format!("Unexpected {}: missing right operand", op.describe()),
                op.position,
            )),
        }
    }

    /// Member access, calls, tagged templates and `new`, left to right.
    fn reduce_access(&mut self) -> JsResult<()> {
        let mut i = 0;
        while i < self.items.len() {
            if self.items[i].is_keyword(Keyword::New) {
                self.reduce_new(i)?;
            }
            if self.items[i].is_expression() {
                self.reduce_chain(i, true)?;
            }
            i += 1;
        }
        Ok(())
    }

    /// `new callee(args)` or `new callee` at `at`; the callee absorbs
    /// member accesses but not calls.
    fn reduce_new(&mut self, at: usize) -> JsResult<()> {
        let position = self.items[at].position;
        match self.items.get(at + 1) {
            Some(next) if next.is_keyword(Keyword::New) => self.reduce_new(at + 1)?,
            Some(next) if next.is_expression() => {}
            _ => return Err(JsError::parse("Expected a constructor after 'new'", position)),
        }
        self.reduce_chain(at + 1, false)?;
        let callee = self
            .node_at(at + 1)
            .ok_or_else(|| JsError::parse("Expected a constructor after 'new'", position))?;
        let (arguments, width) = match self.items.get(at + 2).map(|t| &t.kind) {
            Some(TokenKind::Arguments(args)) => (args.clone(), 3),
            _ => (Vec::new(), 2),
        };
        self.splice(at, width, Node::new(NewExpression { callee, arguments }))?;
        Ok(())
    }

    /// Fold the accessors following the expression at `at` into it.
    fn reduce_chain(&mut self, at: usize, calls: bool) -> JsResult<()> {
        loop {
            let Some(object) = self.node_at(at) else {
                return Ok(());
            };
            let Some(next) = self.items.get(at + 1) else {
                return Ok(());
            };
            let (reduced, width) = match &next.kind {
                TokenKind::Punctuator(Punctuator::Dot) => {
                    let property = self.node_at(at + 2).ok_or_else(|| unexpected(next))?;
                    (member(object, property, false, false), 3)
                }
                TokenKind::Punctuator(Punctuator::OptionalChain) => {
                    let link = self.items.get(at + 2).ok_or_else(|| unexpected(next))?;
                    match &link.kind {
                        TokenKind::Expression(property) => (member(object, property.clone(), false, true), 3),
                        TokenKind::Index(key) => (member(object, key.clone(), true, true), 3),
                        TokenKind::Arguments(args) if calls => (
                            Node::new(CallExpression {
                                callee: object,
                                arguments: args.clone(),
                                optional: true,
                            }),
                            3,
                        ),
                        _ => return Err(unexpected(link)),
                    }
                }
                TokenKind::Index(key) => (member(object, key.clone(), true, false), 2),
                TokenKind::Arguments(args) if calls => (
                    Node::new(CallExpression {
                        callee: object,
                        arguments: args.clone(),
                        optional: false,
                    }),
                    2,
                ),
                TokenKind::Quasi(quasi) if calls => (
                    Node::new(TaggedTemplateExpression {
                        tag: object,
                        quasi: quasi.clone(),
                    }),
                    2,
                ),
                _ => return Ok(()),
            };
            self.splice(at, width, reduced)?;
        }
    }

    /// Postfix `x++` left to right, then prefix `++x` right to left.
    fn reduce_update(&mut self) -> JsResult<()> {
        let is_update = |t: &Token| t.is_punct(Punctuator::PlusPlus) || t.is_punct(Punctuator::MinusMinus);
        let mut i = 1;
        while i < self.items.len() {
            let token = &self.items[i];
            if is_update(token) && !token.newline_before && self.items[i - 1].is_expression() {
                let argument = self.update_target(i - 1, token)?;
                let operator = update_operator(token);
                self.splice(i - 1, 2, Node::new(UpdateExpression { operator, prefix: false, argument }))?;
            } else {
                i += 1;
            }
        }

        let mut i = self.items.len();
        while i > 0 {
            i -= 1;
            let token = &self.items[i];
            if !is_update(token) {
                continue;
            }
            if i > 0 && self.items[i - 1].is_expression() {
                continue;
            }
            if !self.items.get(i + 1).is_some_and(Token::is_expression) {
                return Err(JsError::parse(
                    format!("Unexpected {}: missing operand", token.describe()),
                    token.position,
                ));
            }
            let argument = self.update_target(i + 1, token)?;
            let operator = update_operator(token);
            self.splice(i, 2, Node::new(UpdateExpression { operator, prefix: true, argument }))?;
        }
        Ok(())
    }

    fn update_target(&self, index: usize, op: &Token) -> JsResult<ExprNode> {
        let target = self.node_at(index).ok_or_else(|| unexpected(op))?;
        match &*target {
            Node::Identifier(_) | Node::MemberExpression(_) | Node::SuperMember(_) => Ok(target),
            Node::ParenthesizedExpression(group)
                if matches!(&*group.expression, Node::Identifier(_) | Node::MemberExpression(_)) =>
            {
                Ok(group.expression.clone())
            }
            _ => Err(JsError::parse(
                "Invalid left-hand side expression in update operation",
                op.position,
            )),
        }
    }

    /// Prefix operators, right to left so they nest.
    fn reduce_unary(&mut self) -> JsResult<()> {
        let mut i = self.items.len();
        while i > 0 {
            i -= 1;
            let token = &self.items[i];
            if !token.is_unary() {
                continue;
            }
            let has_left = i > 0 && self.items[i - 1].is_expression();
            let sign = token.is_punct(Punctuator::Plus) || token.is_punct(Punctuator::Minus);
            if sign && has_left {
                continue;
            }
            let Some(argument) = self.node_at(i + 1) else {
                return Err(JsError::parse(
                    format!("Unexpected {}: missing operand", token.describe()),
                    token.position,
                ));
            };
            let reduced = match &token.kind {
                TokenKind::Keyword(Keyword::Await) => Node::new(AwaitExpression { argument }),
                TokenKind::Keyword(keyword) => Node::new(UnaryExpression {
                    operator: keyword.as_str().to_string(),
                    argument,
                }),
                TokenKind::Punctuator(punct) => Node::new(UnaryExpression {
                    operator: punct.as_str().to_string(),
                    argument,
                }),
                _ => return Err(unexpected(token)),
            };
            self.splice(i, 2, reduced)?;
        }
        Ok(())
    }

    /// `**`, right associative.
    fn reduce_exponent(&mut self) -> JsResult<()> {
        let mut i = self.items.len();
        while i > 0 {
            i -= 1;
            if self.items[i].precedence() == Precedence::Exponent {
                let (left, right) = self.operands(i)?;
                self.splice(
                    i - 1,
                    3,
                    Node::new(BinaryExpression {
                        operator: "**".to_string(),
                        left,
                        right,
                    }),
                )?;
                i -= 1;
            }
        }
        Ok(())
    }

    /// Left-associative binary operators of one precedence level.
    fn reduce_binary(&mut self, level: Precedence) -> JsResult<()> {
        let mut i = 0;
        while i < self.items.len() {
            let token = &self.items[i];
            if token.precedence() != level {
                i += 1;
                continue;
            }
            let operator = match &token.kind {
                TokenKind::Punctuator(p) => p.as_str(),
                TokenKind::Keyword(k) => k.as_str(),
                _ => return Err(unexpected(token)),
            }
            .to_string();
            let (left, right) = self.operands(i)?;
            let reduced = if matches!(
                level,
                Precedence::LogicalAnd | Precedence::LogicalOr | Precedence::Nullish
            ) {
                Node::new(LogicalExpression { operator, left, right })
            } else {
                Node::new(BinaryExpression { operator, left, right })
            };
            self.splice(i - 1, 3, reduced)?;
        }
        Ok(())
    }

    /// `value |> callee` and `value |> callee:arg1:arg2`.
    fn reduce_pipeline(&mut self) -> JsResult<()> {
        let mut i = 0;
        while i < self.items.len() {
            if self.items[i].precedence() != Precedence::Pipeline {
                i += 1;
                continue;
            }
            let (left, callee) = self.operands(i)?;
            // Inside a conditional the colon belongs to `? :`
            let in_conditional = self.items[..i].iter().any(|t| t.is_punct(Punctuator::Question));
            let mut arguments = Vec::new();
            let mut end = i + 2;
            while !in_conditional && self.items.get(end).is_some_and(|t| t.is_punct(Punctuator::Colon)) {
                let argument = self
                    .node_at(end + 1)
                    .ok_or_else(|| unexpected(&self.items[end]))?;
                arguments.push(argument);
                end += 2;
            }
            self.splice(i - 1, end - (i - 1), Node::new(PipelineExpression { left, callee, arguments }))?;
        }
        Ok(())
    }

    /// `test ? consequent : alternate`, right associative.
    fn reduce_conditional(&mut self) -> JsResult<()> {
        let mut i = self.items.len();
        while i > 0 {
            i -= 1;
            let token = &self.items[i];
            if !token.is_punct(Punctuator::Question) {
                continue;
            }
            let malformed = || JsError::parse("Malformed conditional expression", token.position);
            let test = i.checked_sub(1).and_then(|l| self.node_at(l)).ok_or_else(malformed)?;
            let consequent = self.node_at(i + 1).ok_or_else(malformed)?;
            if !self.items.get(i + 2).is_some_and(|t| t.is_punct(Punctuator::Colon)) {
                return Err(malformed());
            }
            let alternate = self.node_at(i + 3).ok_or_else(malformed)?;
            self.splice(i - 1, 5, Node::new(ConditionalExpression { test, consequent, alternate }))?;
            i -= 1;
        }
        Ok(())
    }

    /// Assignment operators and `yield`, right associative.
    fn reduce_assignment(&mut self) -> JsResult<()> {
        let mut i = self.items.len();
        while i > 0 {
            i -= 1;
            let token = &self.items[i];
            match &token.kind {
                TokenKind::Punctuator(punct) if punct.is_assignment() => {
                    let position = token.position;
                    let operator = punct.as_str().to_string();
                    let (left, right) = self.operands(i)?;
                    let left = if operator == "=" {
                        to_pattern(&left, false, position)?
                    } else {
                        left
                    };
                    self.splice(i - 1, 3, Node::new(AssignmentExpression { operator, left, right }))?;
                    i -= 1;
                }
                TokenKind::Keyword(Keyword::Yield) | TokenKind::YieldDelegate => {
                    let delegate = matches!(token.kind, TokenKind::YieldDelegate);
                    let argument = self.node_at(i + 1);
                    if delegate && argument.is_none() {
                        return Err(JsError::parse("Unexpected 'yield*': missing operand", token.position));
                    }
                    let width = if argument.is_some() { 2 } else { 1 };
                    self.splice(i, width, Node::new(YieldExpression { argument, delegate }))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// `a, b, c`.
    fn reduce_sequence(&mut self) -> JsResult<()> {
        if !self.items.iter().any(|t| t.is_punct(Punctuator::Comma)) {
            return Ok(());
        }
        let mut expressions = Vec::new();
        for (index, token) in self.items.iter().enumerate() {
            let expected_expression = index % 2 == 0;
            match token.node() {
                Some(node) if expected_expression => expressions.push(node.clone()),
                None if !expected_expression && token.is_punct(Punctuator::Comma) => {}
                _ => return Err(unexpected(token)),
            }
        }
        if self.items.len() % 2 == 0 {
            let last = &self.items[self.items.len() - 1];
            return Err(JsError::parse("Unexpected ',': missing right operand", last.position));
        }
        let position = self.items[0].position;
        let width = self.items.len();
        self.splice(0, width, Node::new(SequenceExpression { expressions }))
    }

    fn finish(self) -> JsResult<ExprNode> {
        let mut items = self.items.into_iter();
        let first = items.next();
        match (first, items.next()) {
            (Some(only), None) => match only.kind {
                TokenKind::Expression(node) => Ok(node),
                _ => Err(unexpected(&only)),
            },
            (Some(first), Some(second)) => {
                let culprit = if first.is_expression() { second } else { first };
                Err(unexpected(&culprit))
            }
            (None, _) => Err(JsError::parse("Expected an expression", SourcePosition::start())),
        }
    }
}

fn member(object: ExprNode, property: ExprNode, computed: bool, optional: bool) -> ExprNode {
    Node::new(MemberExpression {
        object,
        property,
        computed,
        optional,
    })
}

fn update_operator(token: &Token) -> String {
    if token.is_punct(Punctuator::PlusPlus) {
        "++".to_string()
    } else {
        "--".to_string()
    }
}
