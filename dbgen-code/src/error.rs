//! Render errors

use dbgen_sql::DialectError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Dialect(#[from] DialectError),

    #[error("template {template} failed: {message}")]
    Template { template: String, message: String },

    /// Non-fatal: the renderer falls back to unformatted output
    #[error("formatter failed: {0}")]
    Format(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
