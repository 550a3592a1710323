//! Token model shared by the lexer and both parser layers.
//!
//! Tokens are immutable. Each carries its kind, the position of its first
//! character and whether a line break precedes it. Operator kinds declare a
//! [`Precedence`], which drives the order of the expression reduction passes.
//! The expression parser also uses a few kinds the lexer never produces
//! (reduced expressions, argument lists, indexes); they let a token window be
//! rewritten in place until a single expression remains.

use core_types::SourcePosition;
use interpreter::ExprNode;
use num_bigint::BigInt;

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// await keyword
    Await,
    /// break keyword
    Break,
    /// case keyword
    Case,
    /// catch keyword
    Catch,
    /// class keyword
    Class,
    /// const keyword
    Const,
    /// continue keyword
    Continue,
    /// default keyword
    Default,
    /// delete keyword
    Delete,
    /// do keyword
    Do,
    /// else keyword
    Else,
    /// extends keyword
    Extends,
    /// false keyword
    False,
    /// finally keyword
    Finally,
    /// for keyword
    For,
    /// function keyword
    Function,
    /// if keyword
    If,
    /// in keyword
    In,
    /// instanceof keyword
    Instanceof,
    /// let keyword
    Let,
    /// new keyword
    New,
    /// null keyword
    Null,
    /// return keyword
    Return,
    /// super keyword
    Super,
    /// switch keyword
    Switch,
    /// this keyword
    This,
    /// throw keyword
    Throw,
    /// true keyword
    True,
    /// try keyword
    Try,
    /// typeof keyword
    Typeof,
    /// var keyword
    Var,
    /// void keyword
    Void,
    /// while keyword
    While,
    /// yield keyword
    Yield,
    // Note: `of`, `async`, `static`, `get` and `set` are contextual and lex
    // as identifiers
}

impl Keyword {
    /// Look up a reserved word.
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "await" => Keyword::Await,
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "catch" => Keyword::Catch,
            "class" => Keyword::Class,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "default" => Keyword::Default,
            "delete" => Keyword::Delete,
            "do" => Keyword::Do,
            "else" => Keyword::Else,
            "extends" => Keyword::Extends,
            "false" => Keyword::False,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "in" => Keyword::In,
            "instanceof" => Keyword::Instanceof,
            "let" => Keyword::Let,
            "new" => Keyword::New,
            "null" => Keyword::Null,
            "return" => Keyword::Return,
            "super" => Keyword::Super,
            "switch" => Keyword::Switch,
            "this" => Keyword::This,
            "throw" => Keyword::Throw,
            "true" => Keyword::True,
            "try" => Keyword::Try,
            "typeof" => Keyword::Typeof,
            "var" => Keyword::Var,
            "void" => Keyword::Void,
            "while" => Keyword::While,
            "yield" => Keyword::Yield,
            _ => return None,
        };
        Some(keyword)
    }

    /// Source spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Await => "await",
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Class => "class",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Extends => "extends",
            Keyword::False => "false",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::Let => "let",
            Keyword::New => "new",
            Keyword::Null => "null",
            Keyword::Return => "return",
            Keyword::Super => "super",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::True => "true",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::Yield => "yield",
        }
    }
}

/// Operators and delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Opening brace
    LBrace,
    /// Closing brace
    RBrace,
    /// Opening bracket
    LBracket,
    /// Closing bracket
    RBracket,
    /// Semicolon
    Semicolon,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Spread operator
    Spread,
    /// Optional chaining
    OptionalChain,
    /// Colon
    Colon,
    /// Question mark
    Question,
    /// Assignment
    Assign,
    /// Arrow function
    Arrow,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Modulo
    Percent,
    /// Exponentiation
    StarStar,
    /// Equality
    EqEq,
    /// Strict equality
    EqEqEq,
    /// Inequality
    NotEq,
    /// Strict inequality
    NotEqEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Logical AND
    AndAnd,
    /// Logical OR
    OrOr,
    /// Nullish coalescing
    NullishCoalesce,
    /// Pipeline
    Pipeline,
    /// Logical NOT
    Not,
    /// Bitwise AND
    And,
    /// Bitwise OR
    Or,
    /// Bitwise XOR
    Xor,
    /// Bitwise NOT
    Tilde,
    /// Left shift
    LtLt,
    /// Right shift
    GtGt,
    /// Unsigned right shift
    GtGtGt,
    /// Plus equals
    PlusEq,
    /// Minus equals
    MinusEq,
    /// Multiply equals
    StarEq,
    /// Divide equals
    SlashEq,
    /// Modulo equals
    PercentEq,
    /// Exponentiation equals
    StarStarEq,
    /// Bitwise AND equals
    AndEq,
    /// Bitwise OR equals
    OrEq,
    /// Bitwise XOR equals
    XorEq,
    /// Left shift equals
    LtLtEq,
    /// Right shift equals
    GtGtEq,
    /// Unsigned right shift equals
    GtGtGtEq,
    /// Logical AND equals
    AndAndEq,
    /// Logical OR equals
    OrOrEq,
    /// Nullish coalescing equals
    NullishCoalesceEq,
    /// Increment
    PlusPlus,
    /// Decrement
    MinusMinus,
}

impl Punctuator {
    /// Source spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Punctuator::LParen => "(",
            Punctuator::RParen => ")",
            Punctuator::LBrace => "{",
            Punctuator::RBrace => "}",
            Punctuator::LBracket => "[",
            Punctuator::RBracket => "]",
            Punctuator::Semicolon => ";",
            Punctuator::Comma => ",",
            Punctuator::Dot => ".",
            Punctuator::Spread => "...",
            Punctuator::OptionalChain => "?.",
            Punctuator::Colon => ":",
            Punctuator::Question => "?",
            Punctuator::Assign => "=",
            Punctuator::Arrow => "=>",
            Punctuator::Plus => "+",
            Punctuator::Minus => "-",
            Punctuator::Star => "*",
            Punctuator::Slash => "/",
            Punctuator::Percent => "%",
            Punctuator::StarStar => "**",
            Punctuator::EqEq => "==",
            Punctuator::EqEqEq => "===",
            Punctuator::NotEq => "!=",
            Punctuator::NotEqEq => "!==",
            Punctuator::Lt => "<",
            Punctuator::LtEq => "<=",
            Punctuator::Gt => ">",
            Punctuator::GtEq => ">=",
            Punctuator::AndAnd => "&&",
            Punctuator::OrOr => "||",
            Punctuator::NullishCoalesce => "??",
            Punctuator::Pipeline => "|>",
            Punctuator::Not => "!",
            Punctuator::And => "&",
            Punctuator::Or => "|",
            Punctuator::Xor => "^",
            Punctuator::Tilde => "~",
            Punctuator::LtLt => "<<",
            Punctuator::GtGt => ">>",
            Punctuator::GtGtGt => ">>>",
            Punctuator::PlusEq => "+=",
            Punctuator::MinusEq => "-=",
            Punctuator::StarEq => "*=",
            Punctuator::SlashEq => "/=",
            Punctuator::PercentEq => "%=",
            Punctuator::StarStarEq => "**=",
            Punctuator::AndEq => "&=",
            Punctuator::OrEq => "|=",
            Punctuator::XorEq => "^=",
            Punctuator::LtLtEq => "<<=",
            Punctuator::GtGtEq => ">>=",
            Punctuator::GtGtGtEq => ">>>=",
            Punctuator::AndAndEq => "&&=",
            Punctuator::OrOrEq => "||=",
            Punctuator::NullishCoalesceEq => "??=",
            Punctuator::PlusPlus => "++",
            Punctuator::MinusMinus => "--",
        }
    }

    /// Binding strength when used as an operator.
    ///
    /// `+` and `-` report their binary strength; the unary pass claims
    /// them first when they have no left operand.
    pub fn precedence(&self) -> Precedence {
        use Punctuator::*;
        match self {
            Comma => Precedence::Comma,
            Assign | PlusEq | MinusEq | StarEq | SlashEq | PercentEq | StarStarEq | AndEq
            | OrEq | XorEq | LtLtEq | GtGtEq | GtGtGtEq | AndAndEq | OrOrEq
            | NullishCoalesceEq => Precedence::Assignment,
            Question => Precedence::Conditional,
            Pipeline => Precedence::Pipeline,
            NullishCoalesce => Precedence::Nullish,
            OrOr => Precedence::LogicalOr,
            AndAnd => Precedence::LogicalAnd,
            Or => Precedence::BitwiseOr,
            Xor => Precedence::BitwiseXor,
            And => Precedence::BitwiseAnd,
            EqEq | EqEqEq | NotEq | NotEqEq => Precedence::Equality,
            Lt | LtEq | Gt | GtEq => Precedence::Relational,
            LtLt | GtGt | GtGtGt => Precedence::Shift,
            Plus | Minus => Precedence::Additive,
            Star | Slash | Percent => Precedence::Multiplicative,
            StarStar => Precedence::Exponent,
            Not | Tilde => Precedence::Unary,
            PlusPlus | MinusMinus => Precedence::Update,
            Dot | OptionalChain => Precedence::Member,
            _ => Precedence::None,
        }
    }

    /// True for `=` and the compound assignment operators.
    pub fn is_assignment(&self) -> bool {
        self.precedence() == Precedence::Assignment
    }
}

/// Operator binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Not an operator
    None,
    /// `,`
    Comma,
    /// `=`, `+=`, ..., `yield`
    Assignment,
    /// `? :`
    Conditional,
    /// `|>`
    Pipeline,
    /// `??`
    Nullish,
    /// `||`
    LogicalOr,
    /// `&&`
    LogicalAnd,
    /// `|`
    BitwiseOr,
    /// `^`
    BitwiseXor,
    /// `&`
    BitwiseAnd,
    /// `==`, `!=`, `===`, `!==`
    Equality,
    /// `<`, `>`, `<=`, `>=`, `in`, `instanceof`
    Relational,
    /// `<<`, `>>`, `>>>`
    Shift,
    /// `+`, `-`
    Additive,
    /// `*`, `/`, `%`
    Multiplicative,
    /// `**`
    Exponent,
    /// `!`, `~`, `typeof`, `void`, `delete`, `await`, prefix `+` and `-`
    Unary,
    /// `++`, `--`
    Update,
    /// `.`, `?.`, calls, `new`
    Member,
}

/// Decoded parts of a template literal.
#[derive(Debug, Clone)]
pub struct Template {
    /// Cooked text segments, one more than the substitutions
    pub quasis: Vec<String>,
    /// Raw text segments as written
    pub raws: Vec<String>,
    /// Tokens of each `${...}` substitution
    pub substitutions: Vec<Vec<Token>>,
}

/// What a token is, with its decoded payload.
#[derive(Debug, Clone)]
pub enum TokenKind {
    /// Identifier, including contextual words such as `of` and `async`
    Identifier(String),
    /// `#name` inside a class body
    PrivateName(String),
    /// Reserved word
    Keyword(Keyword),
    /// Operator or delimiter
    Punctuator(Punctuator),
    /// Number literal with its source spelling
    Number {
        /// Decoded value
        value: f64,
        /// Spelling in the source
        raw: String,
    },
    /// BigInt literal (`123n`)
    BigInt(BigInt),
    /// String literal
    String {
        /// Decoded value
        value: String,
        /// Quote character used
        quote: char,
    },
    /// Template literal, lexed in full
    Template(Box<Template>),
    /// Regular expression literal
    RegExp {
        /// Text between the slashes
        pattern: String,
        /// Flag characters
        flags: String,
    },
    /// Already reduced expression
    Expression(ExprNode),
    /// Call arguments directly after an expression
    Arguments(Vec<ExprNode>),
    /// `[key]` directly after an expression
    Index(ExprNode),
    /// Template literal directly after an expression
    Quasi(ExprNode),
    /// `yield*`
    YieldDelegate,
    /// End of input
    Eof,
}

/// One lexed token.
#[derive(Debug, Clone)]
pub struct Token {
    /// Kind and payload
    pub kind: TokenKind,
    /// Position of the first character
    pub position: SourcePosition,
    /// A line terminator separates this token from the previous one
    pub newline_before: bool,
    /// Levels of expression tree held by a reduced token, 0 for source
    /// tokens
    pub depth: usize,
}

impl Token {
    /// Create a token.
    pub fn new(kind: TokenKind, position: SourcePosition, newline_before: bool) -> Self {
        Self {
            kind,
            position,
            newline_before,
            depth: 0,
        }
    }

    /// A reduced expression token.
    pub fn expression(node: ExprNode, position: SourcePosition) -> Self {
        Self::new(TokenKind::Expression(node), position, false)
    }

    /// Operator strength of this token.
    pub fn precedence(&self) -> Precedence {
        match &self.kind {
            TokenKind::Punctuator(p) => p.precedence(),
            TokenKind::Keyword(Keyword::In | Keyword::Instanceof) => Precedence::Relational,
            TokenKind::Keyword(
                Keyword::Typeof | Keyword::Void | Keyword::Delete | Keyword::Await,
            ) => Precedence::Unary,
            TokenKind::Keyword(Keyword::Yield) | TokenKind::YieldDelegate => Precedence::Assignment,
            TokenKind::Keyword(Keyword::New) => Precedence::Member,
            _ => Precedence::None,
        }
    }

    /// True for the given punctuator.
    pub fn is_punct(&self, punct: Punctuator) -> bool {
        matches!(&self.kind, TokenKind::Punctuator(p) if *p == punct)
    }

    /// True for the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.kind, TokenKind::Keyword(k) if *k == keyword)
    }

    /// True for the identifier `word`, used for contextual keywords.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(name) if name == word)
    }

    /// Identifier name, if this is one.
    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// True once reduced to an expression.
    pub fn is_expression(&self) -> bool {
        matches!(self.kind, TokenKind::Expression(_))
    }

    /// The reduced node, if any.
    pub fn node(&self) -> Option<&ExprNode> {
        match &self.kind {
            TokenKind::Expression(node) => Some(node),
            _ => None,
        }
    }

    /// True for literal tokens.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number { .. }
                | TokenKind::BigInt(_)
                | TokenKind::String { .. }
                | TokenKind::Template(_)
                | TokenKind::RegExp { .. }
                | TokenKind::Keyword(Keyword::True | Keyword::False | Keyword::Null)
        )
    }

    /// True for operators that may only appear in prefix position.
    pub fn is_unary(&self) -> bool {
        self.precedence() == Precedence::Unary
            || self.is_punct(Punctuator::Plus)
            || self.is_punct(Punctuator::Minus)
    }

    /// True for `=` and the compound assignment operators.
    pub fn is_assignment(&self) -> bool {
        matches!(&self.kind, TokenKind::Punctuator(p) if p.is_assignment())
    }

    /// True for `(`, `[` and `{`.
    pub fn is_opener(&self) -> bool {
        matches!(
            &self.kind,
            TokenKind::Punctuator(Punctuator::LParen | Punctuator::LBracket | Punctuator::LBrace)
        )
    }

    /// True for `)`, `]` and `}`.
    pub fn is_closer(&self) -> bool {
        matches!(
            &self.kind,
            TokenKind::Punctuator(Punctuator::RParen | Punctuator::RBracket | Punctuator::RBrace)
        )
    }

    /// True if an operand can end with this token, so a following `/`
    /// divides and a following line break may end the statement.
    pub fn ends_operand(&self) -> bool {
        match &self.kind {
            TokenKind::Identifier(_)
            | TokenKind::PrivateName(_)
            | TokenKind::Number { .. }
            | TokenKind::BigInt(_)
            | TokenKind::String { .. }
            | TokenKind::Template(_)
            | TokenKind::RegExp { .. }
            | TokenKind::Expression(_) => true,
            TokenKind::Keyword(k) => matches!(
                k,
                Keyword::This | Keyword::Super | Keyword::True | Keyword::False | Keyword::Null
            ),
            TokenKind::Punctuator(p) => matches!(
                p,
                Punctuator::RParen
                    | Punctuator::RBracket
                    | Punctuator::RBrace
                    | Punctuator::PlusPlus
                    | Punctuator::MinusMinus
            ),
            _ => false,
        }
    }

    /// True if this token cannot continue the previous expression, so a
    /// preceding line break ends the statement.
    pub fn starts_statement(&self) -> bool {
        match &self.kind {
            TokenKind::Identifier(_)
            | TokenKind::PrivateName(_)
            | TokenKind::Number { .. }
            | TokenKind::BigInt(_)
            | TokenKind::String { .. }
            | TokenKind::RegExp { .. } => true,
            TokenKind::Keyword(k) => !matches!(k, Keyword::In | Keyword::Instanceof),
            TokenKind::Punctuator(p) => matches!(
                p,
                Punctuator::LBrace
                    | Punctuator::PlusPlus
                    | Punctuator::MinusMinus
                    | Punctuator::Not
                    | Punctuator::Tilde
            ),
            _ => false,
        }
    }

    /// True at end of input.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::PrivateName(name) => format!("'#{}'", name),
            TokenKind::Keyword(k) => format!("'{}'", k.as_str()),
            TokenKind::Punctuator(p) => format!("'{}'", p.as_str()),
            TokenKind::Number { raw, .. } => format!("number {}", raw),
            TokenKind::BigInt(value) => format!("bigint {}n", value),
            TokenKind::String { .. } => "string".to_string(),
            TokenKind::Template(_) | TokenKind::Quasi(_) => "template".to_string(),
            TokenKind::RegExp { .. } => "regular expression".to_string(),
            TokenKind::Expression(node) => format!("expression '{}'", node),
            TokenKind::Arguments(_) => "argument list".to_string(),
            TokenKind::Index(_) => "'['".to_string(),
            TokenKind::YieldDelegate => "'yield*'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn punct(p: Punctuator) -> Token {
        Token::new(TokenKind::Punctuator(p), SourcePosition::start(), false)
    }

    #[test]
    fn test_precedence_order() {
        assert!(punct(Punctuator::Star).precedence() > punct(Punctuator::Plus).precedence());
        assert!(punct(Punctuator::AndAnd).precedence() > punct(Punctuator::OrOr).precedence());
        assert!(punct(Punctuator::OrOr).precedence() > punct(Punctuator::NullishCoalesce).precedence());
        assert!(
            punct(Punctuator::NullishCoalesce).precedence() > punct(Punctuator::Pipeline).precedence()
        );
        assert!(punct(Punctuator::Question).precedence() > punct(Punctuator::Assign).precedence());
    }

    #[test]
    fn test_keyword_operators() {
        let token = Token::new(TokenKind::Keyword(Keyword::Instanceof), SourcePosition::start(), false);
        assert_eq!(token.precedence(), Precedence::Relational);
        let token = Token::new(TokenKind::Keyword(Keyword::Typeof), SourcePosition::start(), false);
        assert!(token.is_unary());
    }

    #[test]
    fn test_classification() {
        assert!(punct(Punctuator::GtGtGtEq).is_assignment());
        assert!(!punct(Punctuator::GtGtGt).is_assignment());
        assert!(punct(Punctuator::RParen).ends_operand());
        assert!(!punct(Punctuator::Plus).ends_operand());
        assert_eq!(Keyword::from_word("instanceof"), Some(Keyword::Instanceof));
        assert_eq!(Keyword::from_word("of"), None);
    }
}
