//! Configuration type definitions
//!
//! These types describe how a schema is turned into generated code.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for dbgen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenConfig {
    /// Name of the generated module, used in the artifact header
    #[serde(default = "default_module")]
    pub module: String,

    /// SQL dialects to render, in output order
    #[serde(default = "default_dialects")]
    pub dialects: Vec<String>,

    /// Run the canonical formatter over the generated source
    #[serde(default = "default_bool_true")]
    pub format: bool,

    /// Rust edition the formatter parses the generated source as
    #[serde(default = "default_edition")]
    pub edition: String,

    /// Output file (stdout when unset)
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
            dialects: default_dialects(),
            format: true,
            edition: default_edition(),
            output: None,
        }
    }
}

fn default_module() -> String {
    "db".to_string()
}

fn default_dialects() -> Vec<String> {
    vec!["postgres".to_string()]
}

fn default_edition() -> String {
    "2021".to_string()
}

fn default_bool_true() -> bool {
    true
}
