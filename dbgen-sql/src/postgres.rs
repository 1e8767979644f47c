//! PostgreSQL

use crate::dialect::{Dialect, Features, PaginationStyle, PlaceholderStyle};
use dbgen_core::ir::{Field, FieldType};

/// PostgreSQL: `RETURNING`, `$n` placeholders, `FETCH FIRST`
#[derive(Debug, Default, Clone, Copy)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &str {
        "postgres"
    }

    fn description(&self) -> &str {
        "PostgreSQL 10 or newer"
    }

    fn features(&self) -> Features {
        Features {
            returning: true,
            last_insert_id: false,
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }

    fn pagination_style(&self) -> PaginationStyle {
        PaginationStyle::FetchFirst
    }

    fn column_type(&self, field: &Field) -> String {
        match field.ty {
            FieldType::Bool => "boolean".to_string(),
            FieldType::Int if field.autoincrement => "serial".to_string(),
            FieldType::Int => "integer".to_string(),
            FieldType::Int64 if field.autoincrement => "bigserial".to_string(),
            FieldType::Int64 => "bigint".to_string(),
            FieldType::Float64 => "double precision".to_string(),
            FieldType::Text => match field.length {
                Some(n) => format!("varchar({})", n),
                None => "text".to_string(),
            },
            FieldType::Blob => "bytea".to_string(),
            FieldType::Timestamp => "timestamp with time zone".to_string(),
        }
    }
}
