//! Exported signature set

use std::collections::BTreeSet;

/// Exported function signatures seen so far, keyed by exact text
///
/// Owned by one render call and threaded through it; the same signature
/// rendered for several dialects is recorded once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signatures {
    seen: BTreeSet<String>,
}

impl Signatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a signature is visible outside the generated module
    pub fn is_exported(signature: &str) -> bool {
        signature.starts_with("pub ")
    }

    /// Record a signature if it is exported; true when newly added
    pub fn record(&mut self, signature: &str) -> bool {
        Self::is_exported(signature) && self.seen.insert(signature.to_string())
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.seen.contains(signature)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Signatures in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut signatures = Signatures::new();
        assert!(signatures.record("pub fn b(&mut self) -> Result<()>"));
        assert!(signatures.record("pub fn a(&mut self) -> Result<()>"));
        assert!(!signatures.record("pub fn a(&mut self) -> Result<()>"));
        assert!(!signatures.record("fn get_last_user(&mut self, rowid: i64) -> Result<User>"));

        assert_eq!(signatures.len(), 2);
        let sorted: Vec<_> = signatures.iter().collect();
        assert!(sorted[0].starts_with("pub fn a"));
    }
}
