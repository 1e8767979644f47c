//! Parser module for the schema DSL
//!
//! This module provides the lexer, syntax tree, typed AST and semantic
//! analyzer for the dbgen DSL.

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod semantic;
pub mod tree;

pub use ast::{Schema, build};
pub use lexer::{LexError, Spanned, Token, TokenStream, tokenize};
pub use parser::{ParseError, Parser, parse};
pub use semantic::{SemanticAnalyzer, SemanticError, SemanticErrors, analyze};
pub use tree::{SyntaxNode, TokenNode, TupleNode, Value};

/// Parse source text into the typed AST
pub fn parse_schema(source: &str) -> Result<Schema, ParseError> {
    let statements = parse(source)?;
    build(&statements)
}
