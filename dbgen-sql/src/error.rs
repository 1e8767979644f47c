//! Dialect errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialectError {
    #[error("unsupported dialect {name:?} (known: {})", known.join(", "))]
    Unsupported { name: String, known: Vec<String> },

    #[error("dialect {dialect} has neither RETURNING nor a row identity to read back {model}")]
    NoFallback { dialect: String, model: String },
}
