//! Untyped syntax tree
//!
//! The parser knows only the structural grammar; the vocabulary of each
//! construct is applied later by the [`ast`](super::ast) projection.

use dbgen_core::Position;
use std::fmt;
use std::ops::Range;

/// A node of the syntax tree
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    /// `keyword args... ( children... )`
    Tuple(TupleNode),
    /// A scalar leaf, or a bare flag inside a group
    Token(TokenNode),
}

impl SyntaxNode {
    pub fn position(&self) -> Position {
        match self {
            SyntaxNode::Tuple(t) => t.keyword.position,
            SyntaxNode::Token(t) => t.position,
        }
    }
}

/// A bracketed construct
#[derive(Debug, Clone, PartialEq)]
pub struct TupleNode {
    pub keyword: TokenNode,

    /// Values following the keyword, in order
    pub args: Vec<TokenNode>,

    /// Entries of every `( ... )` group, in order, keyed by their keyword
    pub children: Vec<(TokenNode, SyntaxNode)>,
}

impl TupleNode {
    /// Construct kind, e.g. `model`
    pub fn kind(&self) -> &str {
        self.keyword.text()
    }

    /// The first argument, conventionally the construct's name
    pub fn name(&self) -> Option<&TokenNode> {
        self.args.first()
    }

    pub fn position(&self) -> Position {
        self.keyword.position
    }
}

/// A scalar value with its position
#[derive(Debug, Clone, PartialEq)]
pub struct TokenNode {
    pub value: Value,
    pub position: Position,
    pub len: usize,
}

impl TokenNode {
    pub fn new(value: Value, position: Position, len: usize) -> Self {
        Self {
            value,
            position,
            len,
        }
    }

    /// Source text of identifiers, paths and operators; empty otherwise
    pub fn text(&self) -> &str {
        match &self.value {
            Value::Ident(s) | Value::Path(s) => s,
            Value::Operator(op) => op,
            _ => "",
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.position.offset..self.position.offset + self.len
    }
}

impl fmt::Display for TokenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// Scalar values
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Ident(String),
    /// Dotted path such as `user.id`, stored as written
    Path(String),
    Integer(i64),
    String(String),
    /// `?`
    Placeholder,
    Operator(&'static str),
}

impl Value {
    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Ident(_) => "identifier",
            Value::Path(_) => "path",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Placeholder => "placeholder",
            Value::Operator(_) => "operator",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ident(s) | Value::Path(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Placeholder => write!(f, "?"),
            Value::Operator(op) => write!(f, "{}", op),
        }
    }
}
