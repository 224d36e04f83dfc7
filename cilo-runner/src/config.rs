//! Tool configuration
//!
//! Settings that are not part of a pipeline: which container binary to
//! drive and which registry mirror prefixes to strip from image references.
//!
//! ```yaml
//! docker:
//!   binary: podman
//!   mirrors:
//!     - registry.example.com
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding `docker.binary`
pub const BINARY_ENV: &str = "CILO_CONTAINER_BINARY";

/// Tool configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub docker: DockerConfig,
}

/// Container runtime settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DockerConfig {
    /// Container CLI to drive (`docker` or `podman`)
    pub binary: String,

    /// Registry prefixes stripped from image references, first match wins
    pub mirrors: Vec<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            mirrors: Vec::new(),
        }
    }
}

impl Config {
    /// Parses configuration from a YAML document
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(source).context("Invalid configuration document")
    }

    /// Loads configuration from a file, applies environment overrides and validates
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;

        let config = Self::from_yaml(&source)?.with_binary_override(std::env::var(BINARY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let config = Self::default().with_binary_override(std::env::var(BINARY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replaces the container binary when an override is given
    pub fn with_binary_override(mut self, binary: Option<String>) -> Self {
        if let Some(binary) = binary.filter(|b| !b.trim().is_empty()) {
            self.docker.binary = binary;
        }
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.docker.binary.trim().is_empty() {
            anyhow::bail!("docker.binary cannot be empty");
        }

        if let Some(index) = self
            .docker
            .mirrors
            .iter()
            .position(|mirror| mirror.trim_end_matches('/').is_empty())
        {
            anyhow::bail!("docker.mirrors[{}] cannot be empty", index);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.docker.binary, "docker");
        assert!(config.docker.mirrors.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(
            "docker:\n  mirrors:\n    - registry.example.com\n    - mirror.local\n",
        )
        .unwrap();

        assert_eq!(config.docker.binary, "docker");
        assert_eq!(
            config.docker.mirrors,
            vec!["registry.example.com", "mirror.local"]
        );

        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("other: 1\n").unwrap(), Config::default());
        assert!(Config::from_yaml("docker: true\n").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.docker.binary = " ".to_string();
        assert!(config.validate().is_err());

        config.docker.binary = "podman".to_string();
        config.docker.mirrors = vec!["ok".to_string(), "/".to_string()];
        assert!(config.validate().is_err());

        config.docker.mirrors = vec!["ok/".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_binary_override() {
        let config = Config::default().with_binary_override(Some("podman".to_string()));
        assert_eq!(config.docker.binary, "podman");

        let config = Config::default().with_binary_override(Some(String::new()));
        assert_eq!(config.docker.binary, "docker");

        let config = Config::default().with_binary_override(None);
        assert_eq!(config.docker.binary, "docker");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "docker:\n  binary: podman\n  mirrors: [mirror.local]").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.docker.mirrors, vec!["mirror.local"]);

        assert!(Config::load(Path::new("/nonexistent/cilo.yml")).is_err());
    }
}
