//! Dialect registry

use crate::dialect::{Dialect, DialectInfo};
use crate::error::DialectError;
use crate::postgres::Postgres;
use crate::sqlite::Sqlite3;
use std::collections::HashMap;
use std::sync::Arc;

/// Dialects by name
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl DialectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Registry holding the built-in dialects
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Postgres));
        registry.register(Arc::new(Sqlite3));
        registry
    }

    /// Register a dialect, replacing any with the same name
    pub fn register(&mut self, dialect: Arc<dyn Dialect>) {
        let name = dialect.name().to_string();
        tracing::debug!("Registering dialect: {}", name);
        self.dialects.insert(name, dialect);
    }

    /// Get a dialect by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        self.dialects.get(name).cloned()
    }

    /// Get a dialect by name, failing for unknown names
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Dialect>, DialectError> {
        self.get(name).ok_or_else(|| DialectError::Unsupported {
            name: name.to_string(),
            known: self.names(),
        })
    }

    /// Resolve several names, in order
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Arc<dyn Dialect>>, DialectError> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.dialects.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered dialects, sorted by name
    pub fn list(&self) -> Vec<DialectInfo> {
        let mut list: Vec<DialectInfo> = self.dialects.values().map(|d| d.info()).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() {
        let registry = DialectRegistry::builtin();
        assert_eq!(registry.names(), vec!["postgres", "sqlite3"]);
        assert!(registry.resolve("postgres").unwrap().features().returning);
        assert!(!registry.resolve("sqlite3").unwrap().features().returning);
    }

    #[test]
    fn test_unsupported() {
        let registry = DialectRegistry::builtin();
        let err = registry.resolve_all(&["sqlite3", "oracle"]).err().unwrap();
        assert_eq!(
            err,
            DialectError::Unsupported {
                name: "oracle".to_string(),
                known: vec!["postgres".to_string(), "sqlite3".to_string()],
            }
        );
        assert_eq!(
            err.to_string(),
            "unsupported dialect \"oracle\" (known: postgres, sqlite3)"
        );
    }

    #[test]
    fn test_register_custom() {
        let mut registry = DialectRegistry::new();
        assert!(registry.get("sqlite3").is_none());
        registry.register(Arc::new(Sqlite3));
        assert_eq!(registry.list()[0].name, "sqlite3");
    }
}
