//! Schema parser
//!
//! Recursive descent parser that converts tokens into the untyped syntax
//! tree. The grammar is purely structural:
//!
//! ```text
//! file   := sep* (entry sep+)* entry? sep*
//! entry  := IDENT value* group*
//! group  := "(" sep* (entry (sep+ entry)*)? sep* ")"
//! value  := IDENT ("." IDENT)* | INT | STRING | "?" | operator
//! sep    := NEWLINE | ","
//! ```

use crate::parser::lexer::{LexError, Spanned, Token, tokenize};
use crate::parser::tree::{SyntaxNode, TokenNode, TupleNode, Value};
use dbgen_core::Position;
use thiserror::Error;

/// Parser error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("{position}: expected {}, got {found:?}", describe_expected(.expected))]
    Expected {
        position: Position,
        expected: Vec<String>,
        found: String,
    },

    #[error("{position}: {field} already defined on {kind}. previous definition at {previous}")]
    PreviouslyDefined {
        position: Position,
        field: String,
        kind: String,
        previous: Position,
    },

    #[error("{position}: {message}")]
    Invalid { position: Position, message: String },
}

impl ParseError {
    pub fn expected(position: Position, expected: &[&str], found: impl ToString) -> Self {
        ParseError::Expected {
            position,
            expected: expected.iter().map(|s| s.to_string()).collect(),
            found: found.to_string(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(e) => e.position(),
            ParseError::Expected { position, .. }
            | ParseError::PreviouslyDefined { position, .. }
            | ParseError::Invalid { position, .. } => *position,
        }
    }
}

fn describe_expected(expected: &[String]) -> String {
    match expected {
        [single] => format!("{:?}", single),
        many => format!("one of {:?}", many),
    }
}

pub(crate) type ParseResult<T> = Result<T, ParseError>;

/// Parser state
pub struct Parser {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from source code
    pub fn new(source: &str) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Self { tokens, pos: 0 })
    }

    /// Parse every top-level statement
    pub fn parse(&mut self) -> ParseResult<Vec<TupleNode>> {
        let mut statements = Vec::new();

        self.skip_separators();
        while !self.is_eof() {
            let (keyword, node) = self.parse_entry()?;
            let statement = match node {
                SyntaxNode::Tuple(tuple) => tuple,
                SyntaxNode::Token(_) => TupleNode {
                    keyword,
                    args: Vec::new(),
                    children: Vec::new(),
                },
            };
            statements.push(statement);

            if !self.is_eof() {
                self.expect_separator(&["newline", "end of input"])?;
            }
            self.skip_separators();
        }

        Ok(statements)
    }

    // ========================================
    // Entries and groups
    // ========================================

    fn parse_entry(&mut self) -> ParseResult<(TokenNode, SyntaxNode)> {
        let keyword = self.expect_ident()?;

        let mut args = Vec::new();
        while let Some(value) = self.parse_value()? {
            args.push(value);
        }

        let mut children = Vec::new();
        let mut grouped = false;
        while self.check(&Token::ParenOpen) {
            grouped = true;
            self.parse_group(&mut children)?;
        }

        if args.is_empty() && !grouped {
            return Ok((keyword.clone(), SyntaxNode::Token(keyword)));
        }

        Ok((
            keyword.clone(),
            SyntaxNode::Tuple(TupleNode {
                keyword,
                args,
                children,
            }),
        ))
    }

    fn parse_group(&mut self, children: &mut Vec<(TokenNode, SyntaxNode)>) -> ParseResult<()> {
        self.expect(Token::ParenOpen)?;
        self.skip_separators();

        while !self.check(&Token::ParenClose) {
            children.push(self.parse_entry()?);
            if self.check(&Token::ParenClose) {
                break;
            }
            self.expect_separator(&[",", "newline", ")"])?;
            self.skip_separators();
        }

        self.expect(Token::ParenClose)
    }

    fn parse_value(&mut self) -> ParseResult<Option<TokenNode>> {
        let start = self.current();
        let position = start.position;
        let value = match start.value.clone() {
            Token::Ident(first) => {
                self.advance();
                let mut path = first.to_string();
                let mut dotted = false;
                while self.check(&Token::Dot) {
                    self.advance();
                    let segment = self.expect_ident()?;
                    path.push('.');
                    path.push_str(segment.text());
                    dotted = true;
                }
                if dotted {
                    Value::Path(path)
                } else {
                    Value::Ident(path)
                }
            }
            Token::Integer(i) => {
                self.advance();
                Value::Integer(i)
            }
            Token::String(s) => {
                self.advance();
                Value::String(s)
            }
            Token::Question => {
                self.advance();
                Value::Placeholder
            }
            token => match token.operator() {
                Some(op) => {
                    self.advance();
                    Value::Operator(op)
                }
                None => return Ok(None),
            },
        };

        let len = self.previous_end() - position.offset;
        Ok(Some(TokenNode::new(value, position, len)))
    }

    // ========================================
    // Token utilities
    // ========================================

    fn current(&self) -> &Spanned<Token> {
        // The token list always ends with Eof and advance() never moves past it
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        &self.current().value
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map(|i| self.tokens[i].span().end)
            .unwrap_or(0)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            let expected = expected.to_string();
            Err(ParseError::expected(
                self.current().position,
                &[expected.as_str()],
                self.peek(),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<TokenNode> {
        let current = self.current();
        if let Token::Ident(s) = &current.value {
            let node = TokenNode::new(Value::Ident(s.to_string()), current.position, current.len);
            self.advance();
            Ok(node)
        } else {
            Err(ParseError::expected(
                current.position,
                &["identifier"],
                &current.value,
            ))
        }
    }

    fn expect_separator(&mut self, expected: &[&str]) -> ParseResult<()> {
        if self.peek().is_separator() {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::expected(self.current().position, expected, self.peek()))
        }
    }

    fn skip_separators(&mut self) {
        while self.peek().is_separator() {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }
}

/// Parse a schema source string into its top-level syntax nodes
pub fn parse(source: &str) -> ParseResult<Vec<TupleNode>> {
    let mut parser = Parser::new(source)?;
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n  // nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_statement_args() {
        let nodes = parse("insert user\nrelation post.user_id user.id").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind(), "insert");
        assert_eq!(nodes[0].name().unwrap().text(), "user");
        assert_eq!(nodes[1].args[0].value, Value::Path("post.user_id".into()));
        assert_eq!(nodes[1].args[0].len, "post.user_id".len());
    }

    #[test]
    fn test_parse_groups() {
        let nodes = parse(
            r#"
            model user (
                key id
                field id int64 ( autoincrement )
                field name text ( length 64, nullable )
            )
            "#,
        )
        .unwrap();

        let model = &nodes[0];
        assert_eq!(model.kind(), "model");
        assert_eq!(model.children.len(), 3);

        let (name, field) = &model.children[2];
        assert_eq!(name.text(), "field");
        let SyntaxNode::Tuple(field) = field else {
            panic!("expected tuple, got {:?}", field);
        };
        assert_eq!(field.args.len(), 2);
        assert_eq!(field.children.len(), 2);
        assert_eq!(field.children[0].0.text(), "length");
        assert!(matches!(field.children[1].1, SyntaxNode::Token(_)));
    }

    #[test]
    fn test_parse_multiple_groups() {
        let nodes = parse("model User (field id int64 autoincrement) (field name text)").unwrap();
        assert_eq!(nodes[0].children.len(), 2);
    }

    #[test]
    fn test_parse_condition_values() {
        let nodes = parse("select user ( where user.id = ? )").unwrap();
        let SyntaxNode::Tuple(cond) = &nodes[0].children[0].1 else {
            panic!("expected where tuple");
        };
        let values: Vec<_> = cond.args.iter().map(|a| a.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Value::Path("user.id".into()),
                Value::Operator("="),
                Value::Placeholder,
            ]
        );
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse("model user (\n  field id int64\n  ( )").unwrap_err();
        assert_eq!(
            err,
            ParseError::Expected {
                position: Position::new(3, 3, 32),
                expected: vec!["identifier".to_string()],
                found: "(".to_string(),
            }
        );
        assert_eq!(err.to_string(), "3:3: expected \"identifier\", got \"(\"");
    }

    #[test]
    fn test_unterminated_group() {
        let err = parse("model user ( field id int64").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("expected one of"), "{}", message);
        assert!(message.contains("end of input"), "{}", message);
    }

    #[test]
    fn test_trailing_garbage() {
        let err = parse("insert user )").unwrap_err();
        assert!(matches!(err, ParseError::Expected { ref found, .. } if found == ")"));
    }

    #[test]
    fn test_lex_error_propagates() {
        let err = parse("model user ( field id $ )").unwrap_err();
        assert!(matches!(err, ParseError::Lex(_)));
        assert_eq!(err.position().column, 23);
    }
}
