//! Post-processing of the generated source

use crate::error::{RenderError, RenderResult};
use std::io::Write;
use std::process::{Command, Stdio};

/// Canonical formatter for the generated source
pub trait Formatter {
    fn format(&self, source: &str) -> RenderResult<String>;
}

/// Pipes the source through `rustfmt`
#[derive(Debug, Clone)]
pub struct Rustfmt {
    pub program: String,
    pub edition: String,
}

impl Default for Rustfmt {
    fn default() -> Self {
        Self {
            program: "rustfmt".to_string(),
            edition: "2021".to_string(),
        }
    }
}

impl Rustfmt {
    /// `rustfmt` parsing the source as the given edition
    pub fn new(edition: impl Into<String>) -> Self {
        Self {
            edition: edition.into(),
            ..Default::default()
        }
    }

    fn args(&self) -> [&str; 4] {
        ["--edition", &self.edition, "--emit", "stdout"]
    }
}

impl Formatter for Rustfmt {
    fn format(&self, source: &str) -> RenderResult<String> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::Format(format!("cannot run {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| RenderError::Format(e.to_string()))?;
        if !output.status.success() {
            return Err(RenderError::Format(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        String::from_utf8(output.stdout).map_err(|e| RenderError::Format(e.to_string()))
    }
}

/// Leaves the source untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Formatter for Verbatim {
    fn format(&self, source: &str) -> RenderResult<String> {
        Ok(source.to_string())
    }
}
