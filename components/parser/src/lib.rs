//! Expression Parser Component
//!
//! Turns source text into the interpreter's typed AST.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes source text, including regex-vs-division context
//! - [`Token`] - Token kinds plus the reduced forms used while parsing
//! - [`Parser`] - Statement parser; hands expression windows to the reducer
//! - [`ClassInfo`] - Member bookkeeping for one class body
//!
//! Expressions are parsed by repeated reduction: a token window is rewritten
//! in place, pass by pass in precedence order, until one expression token
//! remains. Input nested deeper than [`nesting::MAX_NESTING_DEPTH`] levels,
//! or building a tree deeper than [`nesting::MAX_EXPRESSION_DEPTH`], is
//! rejected with a parse error.
//!
//! # Example
//!
//! ```
//! use interpreter::Stack;
//!
//! let program = parser::parse("let x = 2; x * 21").unwrap();
//! let mut stack = Stack::with_globals();
//! let value = program.execute(&mut stack, None).unwrap().value();
//! assert_eq!(value.to_number(), 42.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub(crate) mod expression;
pub mod lexer;
pub mod nesting;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parser::{ClassInfo, Parser};
pub use token::{Keyword, Precedence, Punctuator, Template, Token, TokenKind};

use core_types::JsResult;
use interpreter::{ExprNode, Node};
use tracing::trace;

/// Parse `source` as a program.
pub fn parse(source: &str) -> JsResult<ExprNode> {
    let program = Parser::new(source)?.parse_program()?;
    if let Node::Program(body) = &*program {
        trace!(statements = body.body.len(), "parsed program");
    }
    Ok(program)
}

/// Parse `source` as a single expression.
pub fn parse_expression(source: &str) -> JsResult<ExprNode> {
    Parser::new(source)?.parse_expression()
}
