//! Configuration loader

use crate::config::GenConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Configuration loader for various formats
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<GenConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        tracing::debug!("Loading {} configuration from {}", ext, path.display());

        match ext {
            "json" => Self::from_json(&content),
            "toml" => Self::from_toml(&content),
            _ => Err(Error::Config(format!("Unknown config format: {}", ext))),
        }
    }

    /// Load `dbgen.toml` or `dbgen.json` from a directory, if present
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Option<GenConfig>> {
        for name in ["dbgen.toml", "dbgen.json"] {
            let candidate = dir.as_ref().join(name);
            if candidate.is_file() {
                return Self::load(candidate).map(Some);
            }
        }
        Ok(None)
    }

    /// Parse JSON configuration
    pub fn from_json(content: &str) -> Result<GenConfig> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML configuration
    pub fn from_toml(content: &str) -> Result<GenConfig> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_loading() {
        let json = r#"{"module": "store", "dialects": ["sqlite3"]}"#;
        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.module, "store");
        assert_eq!(config.dialects, vec!["sqlite3".to_string()]);
        assert!(config.format);
        assert_eq!(config.edition, "2021");
    }

    #[test]
    fn test_toml_defaults() {
        let config = ConfigLoader::from_toml("").unwrap();
        assert_eq!(config, GenConfig::default());
    }

    #[test]
    fn test_toml_loading() {
        let config = ConfigLoader::from_toml(
            r#"
            module = "accounts"
            dialects = ["postgres", "sqlite3"]
            format = false
            edition = "2024"
            output = "src/db.rs"
            "#,
        )
        .unwrap();
        assert_eq!(config.dialects.len(), 2);
        assert!(!config.format);
        assert_eq!(config.edition, "2024");
        assert_eq!(config.output.unwrap().to_str(), Some("src/db.rs"));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbgen.yaml");
        std::fs::write(&path, "module: x").unwrap();
        assert!(matches!(ConfigLoader::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigLoader::discover(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join("dbgen.toml"), "module = \"found\"").unwrap();
        let config = ConfigLoader::discover(dir.path()).unwrap().unwrap();
        assert_eq!(config.module, "found");
    }
}
