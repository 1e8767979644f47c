//! Dialect trait

use crate::error::DialectError;
use crate::render;
use crate::statement::Statement;
use dbgen_core::ir::{Count, Delete, Field, Insert, Ir, ModelId, Select, Update};
use serde::Serialize;

/// What a backend can do natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Features {
    /// `INSERT ... RETURNING` / `UPDATE ... RETURNING`
    pub returning: bool,
    /// A row identity readable after a write (e.g. `last_insert_rowid()`)
    pub last_insert_id: bool,
}

/// Parameter placeholder syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    Dollar,
    /// `?`
    Question,
}

impl PlaceholderStyle {
    /// Placeholder for the `n`th parameter, 1-based
    pub fn placeholder(self, n: usize) -> String {
        match self {
            PlaceholderStyle::Dollar => format!("${}", n),
            PlaceholderStyle::Question => "?".to_string(),
        }
    }
}

/// Row limit syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `LIMIT n`
    Limit,
    /// `FETCH FIRST n ROWS ONLY`
    FetchFirst,
}

impl PaginationStyle {
    pub fn clause(self, rows: u32) -> String {
        match self {
            PaginationStyle::Limit => format!("LIMIT {}", rows),
            PaginationStyle::FetchFirst => format!("FETCH FIRST {} ROWS ONLY", rows),
        }
    }
}

/// Dialect description, as listed by the registry
#[derive(Debug, Clone, Serialize)]
pub struct DialectInfo {
    pub name: String,
    pub description: String,
    pub features: Features,
    pub placeholder_style: PlaceholderStyle,
    pub pagination_style: PaginationStyle,
}

/// A SQL backend
///
/// Implementors describe their capabilities and column types; statement
/// rendering has shared default implementations driven by that
/// description, and can be overridden per backend.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn features(&self) -> Features;

    fn placeholder_style(&self) -> PlaceholderStyle;

    fn pagination_style(&self) -> PaginationStyle;

    /// SQL column type for a field
    fn column_type(&self, field: &Field) -> String;

    /// Name of the implicit row identity column, if the backend has one
    fn rowid_column(&self) -> Option<&str> {
        None
    }

    /// Quote an identifier when it would otherwise clash with a keyword
    fn quote(&self, ident: &str) -> String {
        render::quote_if_reserved(ident)
    }

    fn info(&self) -> DialectInfo {
        DialectInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            features: self.features(),
            placeholder_style: self.placeholder_style(),
            pagination_style: self.pagination_style(),
        }
    }

    // ========================================
    // Rendering
    // ========================================

    /// `CREATE TABLE` statements for every model
    fn render_schema(&self, ir: &Ir) -> String {
        render::schema(self, ir)
    }

    fn render_select(&self, ir: &Ir, select: &Select) -> Statement {
        render::select(self, ir, select, false)
    }

    /// Keyset-paged variant of a select; `None` unless the select is paged
    fn render_select_page(&self, ir: &Ir, select: &Select) -> Option<Statement> {
        select.paged.map(|_| render::select(self, ir, select, true))
    }

    fn render_insert(&self, ir: &Ir, insert: &Insert) -> Statement {
        render::insert(self, ir, insert)
    }

    fn render_update(&self, ir: &Ir, update: &Update) -> Statement {
        render::update(self, ir, update)
    }

    fn render_delete(&self, ir: &Ir, delete: &Delete) -> Statement {
        render::delete(self, ir, delete)
    }

    fn render_count(&self, ir: &Ir, count: &Count) -> Statement {
        render::count(self, ir, count, false)
    }

    /// `SELECT EXISTS(...)` variant of a count
    fn render_has(&self, ir: &Ir, count: &Count) -> Statement {
        render::count(self, ir, count, true)
    }

    /// Fetch a written row back by its row identity
    fn render_get_last(&self, ir: &Ir, model: ModelId) -> Result<Statement, DialectError> {
        match self.rowid_column() {
            Some(rowid) if self.features().last_insert_id => {
                Ok(render::get_last(self, ir, model, rowid))
            }
            _ => Err(DialectError::NoFallback {
                dialect: self.name().to_string(),
                model: ir.model(model).name.clone(),
            }),
        }
    }

    /// Row identity of the row an update will touch
    fn render_rowid_lookup(&self, ir: &Ir, update: &Update) -> Result<Statement, DialectError> {
        match self.rowid_column() {
            Some(rowid) if self.features().last_insert_id => {
                Ok(render::rowid_lookup(self, ir, update, rowid))
            }
            _ => Err(DialectError::NoFallback {
                dialect: self.name().to_string(),
                model: ir.model(update.model).name.clone(),
            }),
        }
    }
}
