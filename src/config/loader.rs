//! Layered configuration loading.
//!
//! Sources, later wins:
//! 1. `appsettings.toml` in the content root (optional)
//! 2. `appsettings.{environment}.toml` (optional)
//! 3. process environment variables

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::source::{ResolvedConfig, ResolvedConfigBuilder};
use crate::config::validation::ValidationError;

/// Base settings file name.
pub const BASE_FILE: &str = "appsettings.toml";

/// Environment used when none is given.
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for configuration key {key}")]
    InvalidValue { key: String, value: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builder for the layered configuration source.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    content_root: PathBuf,
    environment: String,
    env_vars: Option<Vec<(String, String)>>,
    overrides: Vec<(String, String)>,
}

impl ConfigLoader {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            env_vars: None,
            overrides: Vec::new(),
        }
    }

    /// Select the environment overlay (`appsettings.{name}.toml`).
    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environment = name.into();
        self
    }

    /// Replace the process environment with an explicit set of variables.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Highest-precedence values applied after every other layer.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    pub fn environment_name(&self) -> &str {
        &self.environment
    }

    /// Resolve every layer into an immutable configuration.
    pub fn load(&self) -> Result<ResolvedConfig, ConfigError> {
        let mut builder = ResolvedConfigBuilder::default();

        let base = self.content_root.join(BASE_FILE);
        let overlay = self
            .content_root
            .join(format!("appsettings.{}.toml", self.environment));

        for path in [base, overlay] {
            if let Some(table) = read_optional_toml(&path)? {
                tracing::debug!(path = %path.display(), "Merging configuration file");
                builder.merge_toml(&table);
            }
        }

        match &self.env_vars {
            Some(vars) => builder.merge_env(vars.iter().cloned()),
            None => builder.merge_env(std::env::vars()),
        }

        for (key, value) in &self.overrides {
            builder.set(key, value.clone());
        }

        Ok(builder.build())
    }
}

fn read_optional_toml(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    toml::from_str::<toml::Table>(&content)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("indexer-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_files_are_optional() {
        let dir = scratch_dir();
        let config = ConfigLoader::new(&dir)
            .with_env_vars(Vec::<(String, String)>::new())
            .load()
            .unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_layer_precedence() {
        let dir = scratch_dir();
        fs::write(
            dir.join(BASE_FILE),
            "SecureToken = \"base\"\nOAuthAudience = \"api\"\n[server]\nurls = \"http://0.0.0.0:5001\"\n",
        )
        .unwrap();
        fs::write(dir.join("appsettings.Development.toml"), "SecureToken = \"dev\"\n").unwrap();

        let config = ConfigLoader::new(&dir)
            .environment("Development")
            .with_env_vars([("server__urls", "http://0.0.0.0:7000")])
            .load()
            .unwrap();

        assert_eq!(config.get("SecureToken"), Some("dev"));
        assert_eq!(config.get("OAuthAudience"), Some("api"));
        assert_eq!(config.get("server.urls"), Some("http://0.0.0.0:7000"));
    }

    #[test]
    fn test_overrides_win() {
        let dir = scratch_dir();
        let config = ConfigLoader::new(&dir)
            .with_env_vars([("SecureToken", "env")])
            .with_override("SecureToken", "override")
            .load()
            .unwrap();
        assert_eq!(config.get("SecureToken"), Some("override"));
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = scratch_dir();
        fs::write(dir.join(BASE_FILE), "SecureToken = \n").unwrap();
        let err = ConfigLoader::new(&dir)
            .with_env_vars(Vec::<(String, String)>::new())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
