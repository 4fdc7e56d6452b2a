use std::path::Path;

use serde::Deserialize;

/// Operator-tunable knobs for a CLI-run node.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GodlessConfig {
    /// The dispatcher's query-handler semaphore size.
    pub query_concurrency: usize,
    /// When true, `replicate` requires every peer link to carry a
    /// signature verifiable under a known public key.
    pub is_public_index: bool,
}

impl Default for GodlessConfig {
    fn default() -> Self {
        Self {
            query_concurrency: 4,
            is_public_index: false,
        }
    }
}

impl GodlessConfig {
    /// Loads config from `path` if it exists, falling back to defaults
    /// otherwise — the CLI's config file is always optional.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = GodlessConfig::load(Path::new("/nonexistent/godless.toml")).unwrap();
        assert_eq!(config.query_concurrency, 4);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = std::env::temp_dir().join("godless-cli-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("godless.toml");
        std::fs::write(&path, "is_public_index = true\n").unwrap();
        let config = GodlessConfig::load(&path).unwrap();
        assert!(config.is_public_index);
        assert_eq!(config.query_concurrency, 4);
    }
}
