//! dbgen schema front end
//!
//! This crate turns schema DSL source into the resolved IR: lexing,
//! parsing into an untyped syntax tree, projection onto the typed AST and
//! semantic analysis.
//!
//! # Example
//!
//! ```rust
//! use dbgen_syntax::compile;
//!
//! let source = r#"
//!     model user (
//!         field id int64 autoincrement
//!         field name text
//!     )
//!     insert user
//!     select user ( where user.id = ? )
//! "#;
//!
//! let ir = compile(source).unwrap();
//! assert_eq!(ir.models.len(), 1);
//! assert!(ir.selects[0].one());
//! ```

pub mod parser;
pub mod report;

pub use parser::{
    LexError, ParseError, Schema, SemanticAnalyzer, SemanticError, SemanticErrors, Token,
    analyze, parse, parse_schema, tokenize,
};
pub use report::{Diagnostic, context_snippet};

use dbgen_core::Position;
use dbgen_core::ir::Ir;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Full compilation pipeline: source -> IR
pub fn compile(source: &str) -> Result<Ir, CompileError> {
    let statements = parse(source)?;
    debug!(statements = statements.len(), "parsed schema");

    let schema = parser::build(&statements)?;
    let ir = analyze(&schema)?;
    Ok(ir)
}

/// Read and compile a schema file
pub fn compile_file(path: impl AsRef<Path>) -> Result<(String, Ir), CompileError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = source.len(), "read schema");
    let ir = compile(&source)?;
    Ok((source, ir))
}

/// Compilation error
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticErrors),
}

impl CompileError {
    /// Position of the first problem
    pub fn position(&self) -> Option<Position> {
        match self {
            CompileError::Io { .. } => None,
            CompileError::Parse(e) => Some(e.position()),
            CompileError::Semantic(errors) => errors.first().map(SemanticError::position),
        }
    }

    /// One diagnostic per reported problem
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CompileError::Io { .. } => vec![Diagnostic::new(self.to_string(), None, 0)],
            CompileError::Parse(e) => vec![parse_diagnostic(e)],
            CompileError::Semantic(errors) => errors.iter().map(semantic_diagnostic).collect(),
        }
    }
}

fn parse_diagnostic(error: &ParseError) -> Diagnostic {
    match error {
        ParseError::Lex(LexError::UnexpectedChar { position, text }) => {
            Diagnostic::new(error.to_string(), Some(*position), text.len())
        }
        ParseError::Expected {
            position, found, ..
        } => Diagnostic::new(error.to_string(), Some(*position), found.len()),
        ParseError::PreviouslyDefined {
            position,
            field,
            previous,
            ..
        } => Diagnostic::new(error.to_string(), Some(*position), field.len()).with_note(
            *previous,
            field.len(),
            "previous definition",
        ),
        ParseError::Invalid { position, .. } => {
            Diagnostic::new(error.to_string(), Some(*position), 1)
        }
    }
}

fn semantic_diagnostic(error: &SemanticError) -> Diagnostic {
    let diagnostic = Diagnostic::new(error.to_string(), Some(error.position()), error.span_len());
    match error {
        SemanticError::DuplicateModel { previous, .. }
        | SemanticError::DuplicateTable { previous, .. }
        | SemanticError::DuplicateColumn { previous, .. } => {
            diagnostic.with_note(*previous, error.span_len(), "previous definition")
        }
        _ => diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbgen_core::ir::Cardinality;

    #[test]
    fn test_user_scenario() {
        let source = r#"
            model User (field id int64 autoincrement) (field name text)
            insert User
            select User ( where User.id = ? )
        "#;
        let ir = compile(source).unwrap();
        assert_eq!(ir.models.len(), 1);
        assert_eq!(ir.models[0].table, "user");
        assert_eq!(ir.inserts.len(), 1);
        assert_eq!(ir.selects[0].cardinality, Cardinality::One);
        assert_eq!(ir.returning_targets.len(), 1);
    }

    #[test]
    fn test_duplicate_field_scenario() {
        let source = "model User ( field id int64 ) ( field id text )";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, CompileError::Parse(ParseError::PreviouslyDefined { .. })));
        assert_eq!(err.position(), Some(Position::new(1, 39, 38)));

        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].notes[0].position, Position::new(1, 20, 19));

        let text = diagnostics[0].render_plain(source);
        assert!(text.contains("previous definition at 1:20"));
        assert!(text.contains("^^"));
    }

    #[test]
    fn test_ir_serializes() {
        let ir = compile("model tag ( field id int64 autoincrement )\nselect tag.id").unwrap();
        let json = serde_json::to_value(&ir).unwrap();
        assert_eq!(json["models"][0]["table"], "tag");
        assert_eq!(json["selects"][0]["cardinality"], "many");
    }

    #[test]
    fn test_semantic_diagnostics() {
        let err = compile("insert ghost\ncount phantom").unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].span_len, "ghost".len());
        assert_eq!(err.position(), Some(Position::new(1, 8, 7)));
    }

    #[test]
    fn test_lex_error_diagnostic() {
        let err = compile("model user ( field id int64 ) @").unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics[0].position.unwrap().column, 31);
    }

    #[test]
    fn test_compile_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.dbx");
        std::fs::write(&path, "model tag ( field id int64 autoincrement )\ninsert tag\n").unwrap();
        let (source, ir) = compile_file(&path).unwrap();
        assert!(source.starts_with("model tag"));
        assert_eq!(ir.inserts.len(), 1);

        let missing = compile_file(dir.path().join("missing.dbx")).unwrap_err();
        assert!(matches!(missing, CompileError::Io { .. }));
        assert_eq!(missing.position(), None);
    }
}
