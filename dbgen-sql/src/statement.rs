//! Rendered statements

use dbgen_core::ir::Column;
use serde::Serialize;
use std::fmt;

/// What a placeholder is bound to, in placeholder order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    /// Value written to a column
    Value(Column),
    /// Value compared against a column in a condition
    Filter(Column),
    /// Keyset cursor; rows strictly after this value of the column
    Cursor(Column),
    /// Row identity
    RowId,
}

impl Param {
    pub fn column(self) -> Option<Column> {
        match self {
            Param::Value(c) | Param::Filter(c) | Param::Cursor(c) => Some(c),
            Param::RowId => None,
        }
    }
}

/// SQL text with the meaning of each placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
