//! Configuration for `lum`.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - the TOML config file (`--config`, or `<config-dir>/lum/config.toml`)
//! - command-line flags
//!
//! ```toml
//! [serve]
//! port = 6333
//!
//! [render]
//! theme = "InspiredGitHub"
//! alerts = true
//! ```

mod runtime;

pub use runtime::{RuntimeDir, RuntimeDirError};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::log;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 6333;

/// Default syntect theme for fenced code blocks.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LumConfig {
    pub serve: ServeConfig,
    pub render: RenderConfig,
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// HTTP port on the loopback interface.
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// `[render]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Highlighting theme name (any theme bundled with syntect).
    pub theme: String,
    /// Render GitHub-style `> [!NOTE]` alerts.
    pub alerts: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            alerts: true,
        }
    }
}

impl LumConfig {
    /// Load configuration and apply the command-line port override.
    ///
    /// An explicit `config` path must exist. Without one, the default
    /// location is used only when the file is present.
    pub fn load(config: Option<&Path>, port: Option<u16>) -> Result<Self, ConfigError> {
        let mut loaded = match config {
            Some(path) => Self::from_path(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_path(&path)?,
                None => Self::default(),
            },
        };

        if let Some(port) = port {
            loaded.serve.port = port;
        }

        loaded.validate()?;
        Ok(loaded)
    }

    /// `<config-dir>/lum/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lum").join("config.toml"))
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        for field in &ignored {
            log!("warning"; "unknown field `{}` in {}, ignoring", field, path.display());
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.port == 0 {
            return Err(ConfigError::Validation(
                "serve.port must be between 1 and 65535".into(),
            ));
        }
        if self.render.theme.trim().is_empty() {
            return Err(ConfigError::Validation("render.theme must not be empty".into()));
        }
        Ok(())
    }
}
