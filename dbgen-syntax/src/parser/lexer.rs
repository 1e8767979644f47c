//! Lexer for the dbgen schema DSL
//!
//! Tokenizes schema source text.
//!
//! Key features:
//! - Newlines are significant (they terminate entries), other whitespace is skipped
//! - `//` and `#` start comments that run to the end of the line
//! - Identifiers, integers and "..." strings
//! - `user.id` is lexed as Ident, Dot, Ident; the parser joins paths

use dbgen_core::Position;
use logos::Logos;
use smartstring::alias::String as Ident;
use std::fmt;
use std::ops::Range;

/// A token with its position in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub position: Position,
    /// Length in bytes
    pub len: usize,
}

impl<T> Spanned<T> {
    pub fn new(value: T, position: Position, len: usize) -> Self {
        Self {
            value,
            position,
            len,
        }
    }

    /// Byte range covered in the source
    pub fn span(&self) -> Range<usize> {
        self.position.offset..self.position.offset + self.len
    }
}

/// Token types for the schema DSL
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Skip whitespace, but NOT newlines
    #[regex(r"[ \t\f\r]+", logos::skip)]
    Whitespace,

    #[regex(r"(//|#)[^\n]*", logos::skip)]
    Comment,

    // ============================================================
    // Structural
    // ============================================================
    #[token("\n")]
    Newline,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("?")]
    Question,

    // ============================================================
    // Operators
    // ============================================================
    #[token("=")]
    Eq,

    #[token("!=")]
    Ne,

    #[token("<")]
    Lt,

    #[token("<=")]
    Le,

    #[token(">")]
    Gt,

    #[token(">=")]
    Ge,

    // ============================================================
    // Values
    // ============================================================
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    /// Quoted string literal: "..."
    #[regex(r#""([^"\\\n]|\\[^\n])*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len()-1])
    })]
    String(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| Ident::from(lex.slice()))]
    Ident(Ident),

    /// End of input marker, produced by [`TokenStream`] only
    Eof,
}

impl Token {
    /// Operator spelling, if this is an operator token
    pub fn operator(&self) -> Option<&'static str> {
        Some(match self {
            Token::Eq => "=",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            _ => return None,
        })
    }

    /// Whether this token terminates an entry
    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Newline | Token::Comma)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Newline => write!(f, "newline"),
            Token::ParenOpen => write!(f, "("),
            Token::ParenClose => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Question => write!(f, "?"),
            Token::Integer(i) => write!(f, "{}", i),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "end of input"),
            Token::Whitespace | Token::Comment => write!(f, "{:?}", self),
            op => write!(f, "{}", op.operator().unwrap_or_default()),
        }
    }
}

/// Unescape a string literal
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("{position}: unexpected character {text:?}")]
    UnexpectedChar { position: Position, text: String },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedChar { position, .. } => *position,
        }
    }
}

/// Lazy token iterator over one source text
///
/// Yields every token with its position, then a single [`Token::Eof`].
/// Iteration stops after the first error. The stream is `Clone`, so a copy
/// taken before iterating restarts from the same point.
#[derive(Clone)]
pub struct TokenStream<'src> {
    inner: logos::Lexer<'src, Token>,
    line: usize,
    line_start: usize,
    done: bool,
}

impl<'src> TokenStream<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: Token::lexer(source),
            line: 1,
            line_start: 0,
            done: false,
        }
    }

    fn position_at(&self, offset: usize) -> Position {
        Position::new(self.line, offset - self.line_start + 1, offset)
    }
}

impl Iterator for TokenStream<'_> {
    type Item = Result<Spanned<Token>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.inner.next() {
            Some(Ok(token)) => {
                let span = self.inner.span();
                let position = self.position_at(span.start);
                if token == Token::Newline {
                    self.line += 1;
                    self.line_start = span.end;
                }
                Some(Ok(Spanned::new(token, position, span.len())))
            }
            Some(Err(())) => {
                self.done = true;
                let span = self.inner.span();
                Some(Err(LexError::UnexpectedChar {
                    position: self.position_at(span.start),
                    text: self.inner.slice().to_string(),
                }))
            }
            None => {
                self.done = true;
                let end = self.inner.source().len();
                Some(Ok(Spanned::new(Token::Eof, self.position_at(end), 0)))
            }
        }
    }
}

/// Lexer result type
pub type LexResult = Result<Vec<Spanned<Token>>, LexError>;

/// Tokenize a schema source string, including the trailing [`Token::Eof`]
pub fn tokenize(source: &str) -> LexResult {
    TokenStream::new(source).collect()
}
