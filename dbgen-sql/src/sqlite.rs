//! SQLite 3

use crate::dialect::{Dialect, Features, PaginationStyle, PlaceholderStyle};
use dbgen_core::ir::{Field, FieldType};

/// SQLite 3: no `RETURNING`; written rows are read back through `_rowid_`
#[derive(Debug, Default, Clone, Copy)]
pub struct Sqlite3;

impl Dialect for Sqlite3 {
    fn name(&self) -> &str {
        "sqlite3"
    }

    fn description(&self) -> &str {
        "SQLite 3, rows read back through last_insert_rowid()"
    }

    fn features(&self) -> Features {
        Features {
            returning: false,
            last_insert_id: true,
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    fn pagination_style(&self) -> PaginationStyle {
        PaginationStyle::Limit
    }

    fn column_type(&self, field: &Field) -> String {
        // A single INTEGER primary key column aliases the rowid
        match field.ty {
            FieldType::Bool | FieldType::Int | FieldType::Int64 => "INTEGER",
            FieldType::Float64 => "REAL",
            FieldType::Text => "TEXT",
            FieldType::Blob => "BLOB",
            FieldType::Timestamp => "TIMESTAMP",
        }
        .to_string()
    }

    fn rowid_column(&self) -> Option<&str> {
        Some("_rowid_")
    }
}
