//! Semantic analysis for the schema DSL
//!
//! Resolves the typed AST into the IR: registers models, resolves relation
//! endpoints, resolves queries (joins, conditions, projections), classifies
//! cardinality and shapes results. Independent problems are collected and
//! reported together as [`SemanticErrors`].

mod models;
mod queries;

use crate::parser::ast::{ColumnRef, Schema};
use dbgen_core::Position;
use dbgen_core::ir::{Column, Ir, ModelId};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Semantic analysis errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    #[error("{position}: model {name} already defined. previous definition at {previous}")]
    DuplicateModel {
        name: String,
        position: Position,
        previous: Position,
    },

    #[error("{position}: table {table} of model {model} already defined. previous definition at {previous}")]
    DuplicateTable {
        model: String,
        table: String,
        position: Position,
        previous: Position,
    },

    #[error("{position}: column {column} of field {field} already defined on model {model}. previous definition at {previous}")]
    DuplicateColumn {
        model: String,
        field: String,
        column: String,
        position: Position,
        previous: Position,
    },

    #[error("{position}: unknown model {name:?}")]
    UnknownModel { name: String, position: Position },

    #[error("{position}: model {model} has no field {field:?}")]
    UnknownField {
        model: String,
        field: String,
        position: Position,
    },

    #[error("{position}: model {model} needs a key or exactly one autoincrement field")]
    MissingPrimaryKey { model: String, position: Position },

    #[error("{position}: malformed key on model {model}: {message}")]
    MalformedKey {
        model: String,
        message: String,
        position: Position,
    },

    #[error("{position}: {message}")]
    InvalidAttribute { message: String, position: Position },

    #[error("{position}: invalid relation {left} -> {right}: {message}")]
    InvalidRelation {
        left: String,
        right: String,
        message: String,
        position: Position,
    },

    #[error("{position}: no relation joins {left} and {right}")]
    InvalidJoin {
        left: String,
        right: String,
        position: Position,
    },

    #[error("{position}: ambiguous join from {base} to {model}: more than one shortest relation path")]
    AmbiguousJoin {
        base: String,
        model: String,
        position: Position,
    },

    #[error("{position}: model {model} is not reachable from {base} through any relation")]
    UnreachableModel {
        base: String,
        model: String,
        position: Position,
    },

    #[error("{position}: {message}")]
    InvalidQuery { message: String, position: Position },
}

impl SemanticError {
    pub fn position(&self) -> Position {
        match self {
            SemanticError::DuplicateModel { position, .. }
            | SemanticError::DuplicateTable { position, .. }
            | SemanticError::DuplicateColumn { position, .. }
            | SemanticError::UnknownModel { position, .. }
            | SemanticError::UnknownField { position, .. }
            | SemanticError::MissingPrimaryKey { position, .. }
            | SemanticError::MalformedKey { position, .. }
            | SemanticError::InvalidAttribute { position, .. }
            | SemanticError::InvalidRelation { position, .. }
            | SemanticError::InvalidJoin { position, .. }
            | SemanticError::AmbiguousJoin { position, .. }
            | SemanticError::UnreachableModel { position, .. }
            | SemanticError::InvalidQuery { position, .. } => *position,
        }
    }

    /// Length of the source span the error points at, when known
    pub fn span_len(&self) -> usize {
        match self {
            SemanticError::DuplicateModel { name, .. } => name.len(),
            SemanticError::DuplicateTable { table, .. } => table.len(),
            SemanticError::DuplicateColumn { field, .. } => field.len(),
            SemanticError::UnknownModel { name, .. } => name.len(),
            SemanticError::UnknownField { field, .. } => field.len(),
            _ => 1,
        }
    }
}

/// Every semantic error found in one compilation unit, in source order
#[derive(Debug, Clone, PartialEq, Error)]
pub struct SemanticErrors(pub Vec<SemanticError>);

impl SemanticErrors {
    pub fn iter(&self) -> impl Iterator<Item = &SemanticError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&SemanticError> {
        self.0.first()
    }
}

impl fmt::Display for SemanticErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl IntoIterator for SemanticErrors {
    type Item = SemanticError;
    type IntoIter = std::vec::IntoIter<SemanticError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Semantic analyzer
///
/// Built once per compilation unit; [`analyze`](Self::analyze) consumes it.
#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
    ir: Ir,
    errors: Vec<SemanticError>,

    /// Position of each registered model's name, keyed by its snake_case form
    model_names: HashMap<String, Position>,

    /// Position each table name was claimed at
    table_names: HashMap<String, Position>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the AST into the IR
    pub fn analyze(mut self, schema: &Schema) -> Result<Ir, SemanticErrors> {
        // Phase 1: models, then relations between them
        for model in &schema.models {
            self.register_model(model);
        }
        for relation in &schema.relations {
            self.resolve_relation(relation);
        }
        debug!(
            models = self.ir.models.len(),
            relations = self.ir.relations.len(),
            "registered models"
        );

        // Phase 2: queries
        for insert in &schema.inserts {
            self.resolve_insert(insert);
        }
        for select in &schema.selects {
            self.resolve_select(select);
        }
        for update in &schema.updates {
            self.resolve_update(update);
        }
        for delete in &schema.deletes {
            self.resolve_delete(delete);
        }
        for count in &schema.counts {
            self.resolve_count(count);
        }

        // Phase 3: models needing a written-row accessor
        let written = self
            .ir
            .inserts
            .iter()
            .map(|i| i.model)
            .chain(self.ir.updates.iter().map(|u| u.model));
        let mut targets: Vec<ModelId> = Vec::new();
        for model in written {
            if !targets.contains(&model) {
                targets.push(model);
            }
        }
        self.ir.returning_targets = targets;

        if self.errors.is_empty() {
            debug!(
                selects = self.ir.selects.len(),
                inserts = self.ir.inserts.len(),
                updates = self.ir.updates.len(),
                deletes = self.ir.deletes.len(),
                counts = self.ir.counts.len(),
                "resolved queries"
            );
            Ok(self.ir)
        } else {
            self.errors.sort_by_key(SemanticError::position);
            debug!(errors = self.errors.len(), "semantic analysis failed");
            Err(SemanticErrors(self.errors))
        }
    }

    fn error(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    /// Resolve a `model.field` reference, recording an error when dangling
    fn resolve_column(&mut self, column: &ColumnRef) -> Option<Column> {
        let model = self.resolve_model(&column.model.value, column.model.position)?;
        match self.ir.model(model).field_by_name(&column.field.value) {
            Some(field) => Some(Column::new(model, field)),
            None => {
                self.error(SemanticError::UnknownField {
                    model: column.model.value.clone(),
                    field: column.field.value.clone(),
                    position: column.field.position,
                });
                None
            }
        }
    }

    fn resolve_model(&mut self, name: &str, position: Position) -> Option<ModelId> {
        let found = self.ir.model_by_name(name);
        if found.is_none() {
            self.error(SemanticError::UnknownModel {
                name: name.to_string(),
                position,
            });
        }
        found
    }
}

/// Resolve a parsed schema into the IR
pub fn analyze(schema: &Schema) -> Result<Ir, SemanticErrors> {
    SemanticAnalyzer::new().analyze(schema)
}
