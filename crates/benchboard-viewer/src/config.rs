//! Viewer configuration: a TOML file with every key defaulted, an
//! environment variable for the data environment, and CLI overrides on top.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use benchboard_protocol::{BoardError, DisplayMode, ModelRef, PRODUCTION_DATA_ROOT};
use benchboard_state::{ErrorBars, Theme};
use serde::{Deserialize, Serialize};

/// Overrides `environment` when set.
pub const ENV_VAR: &str = "BENCHBOARD_ENV";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Data read from relative paths under `local_root`.
    Development,
    #[default]
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Data root per environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentRoots {
    pub development: String,
    pub production: String,
}

impl Default for EnvironmentRoots {
    fn default() -> Self {
        Self {
            development: String::new(),
            production: PRODUCTION_DATA_ROOT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub environment: Environment,
    pub environments: EnvironmentRoots,
    pub mode: DisplayMode,
    pub theme: Theme,
    /// Requested dataset version; the manifest default when unset.
    pub version: Option<String>,
    pub community_vendor: String,
    pub community_model: String,
    pub error_bars: ErrorBars,
    pub local_root: PathBuf,
    pub request_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            environments: EnvironmentRoots::default(),
            mode: DisplayMode::default(),
            theme: Theme::default(),
            version: None,
            community_vendor: "openai".to_string(),
            community_model: "gpt-oss-20b".to_string(),
            error_bars: ErrorBars::default(),
            local_root: PathBuf::from("."),
            request_timeout_secs: 15,
            log_file: None,
        }
    }
}

impl ViewerConfig {
    /// `<config_dir>/benchboard/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("benchboard").join("config.toml"))
    }

    /// Load from `path`, or from the default location when it exists.
    /// A missing default file yields the built-in defaults; an explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, BoardError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        if let Ok(value) = std::env::var(ENV_VAR) {
            config.apply_env_override(&value)?;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, BoardError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BoardError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&raw)
            .map_err(|e| BoardError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn apply_env_override(&mut self, value: &str) -> Result<(), BoardError> {
        self.environment = value
            .parse()
            .map_err(|e| BoardError::Config(format!("{ENV_VAR}: {e}")))?;
        Ok(())
    }

    /// Base of every data path for the active environment.
    pub fn data_root(&self) -> &str {
        let root = match self.environment {
            Environment::Development => &self.environments.development,
            Environment::Production => &self.environments.production,
        };
        root.trim_end_matches('/')
    }

    pub fn community_model(&self) -> ModelRef {
        ModelRef::new(&self.community_vendor, &self.community_model)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ViewerConfig::from_toml("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.data_root(), PRODUCTION_DATA_ROOT);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ViewerConfig::from_toml(
            r#"
            environment = "development"
            mode = "community"
            theme = "dark"
            error_bars = "confidence95"

            [environments]
            development = "data/"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_root(), "data");
        assert_eq!(config.mode, DisplayMode::Community);
        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.error_bars, ErrorBars::Confidence95);
        assert_eq!(config.environments.production, PRODUCTION_DATA_ROOT);
        assert_eq!(config.community_model().to_string(), "openai/gpt-oss-20b");
    }

    #[test]
    fn env_override_is_validated() {
        let mut config = ViewerConfig::default();
        config.apply_env_override("development").unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert!(config.apply_env_override("staging").is_err());
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "version = \"v1.2\"\nrequest_timeout_secs = 3\n").unwrap();
        let config = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(config.version.as_deref(), Some("v1.2"));
        assert_eq!(config.request_timeout().as_secs(), 3);

        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            ViewerConfig::from_file(&missing),
            Err(BoardError::Config(_))
        ));
    }
}
