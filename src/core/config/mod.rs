//! core::config
//!
//! Configuration loading and writing.
//!
//! # Precedence
//!
//! The config file is located in this order (first hit wins):
//! 1. An explicit path (the CLI's `--config`)
//! 2. `$REPOFED_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/repofed/config.toml`
//! 4. `~/.repofed/config.toml` (canonical write location)
//!
//! A missing file is not an error: defaults (no sources) are used and the
//! location that would have been read is remembered as the write target.
//!
//! # Example
//!
//! ```no_run
//! use repofed::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! for source in result.config.sources() {
//!     println!("{} ({})", source.name, source.connector);
//! }
//! ```

pub mod schema;

pub use schema::{LoggingConfig, MimeConfig, RepofedConfig, SourceConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "REPOFED_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

/// Loaded configuration plus where it came from.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: RepofedConfig,
    /// File that was read, if any.
    loaded_from: Option<PathBuf>,
    /// Where `write` will save.
    target: Option<PathBuf>,
}

impl Config {
    /// Wrap an in-memory configuration with no backing file.
    pub fn from_file(file: RepofedConfig) -> Self {
        Self {
            file,
            loaded_from: None,
            target: None,
        }
    }

    /// Load configuration, honoring `explicit` first.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        Self::load_with(explicit, env, dirs::home_dir())
    }

    /// [`Config::load`] with the environment and home directory supplied.
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        if let Some(path) = explicit {
            return Self::load_from(path.to_path_buf(), warnings);
        }

        if let Some(path) = env(CONFIG_ENV).map(PathBuf::from) {
            if path.exists() {
                return Self::load_from(path, warnings);
            }
            warnings.push(ConfigWarning {
                message: format!("${CONFIG_ENV} points at a missing file; ignoring it"),
                path,
            });
        }

        if let Some(xdg_home) = env("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("repofed/config.toml");
            if path.exists() {
                return Self::load_from(path, warnings);
            }
        }

        let canonical = home.map(|h| h.join(".repofed/config.toml"));
        match canonical {
            Some(path) if path.exists() => Self::load_from(path, warnings),
            target => Ok(ConfigLoadResult {
                config: Config {
                    file: RepofedConfig::default(),
                    loaded_from: None,
                    target,
                },
                warnings,
            }),
        }
    }

    fn load_from(path: PathBuf, warnings: Vec<ConfigWarning>) -> Result<ConfigLoadResult, ConfigError> {
        let (file, loaded_from) = if path.exists() {
            (Self::read(&path)?, Some(path.clone()))
        } else {
            (RepofedConfig::default(), None)
        };
        Ok(ConfigLoadResult {
            config: Config {
                file,
                loaded_from,
                target: Some(path),
            },
            warnings,
        })
    }

    /// Read, parse and validate a config file.
    pub fn read(path: &Path) -> Result<RepofedConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: RepofedConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    /// The canonical config path, `~/.repofed/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".repofed/config.toml"))
    }

    /// Validate and save `self.file` atomically to the load location (or the
    /// canonical path when none was determined).
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        self.file.validate()?;
        let path = match &self.target {
            Some(path) => path.clone(),
            None => Self::default_path()?,
        };
        Self::write_atomic(&path, &self.file)?;
        Ok(path)
    }

    /// Write a config file atomically (temp file + rename).
    pub fn write_atomic(path: &Path, config: &RepofedConfig) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let write_error = |source| ConfigError::WriteError {
            path: temp_path.clone(),
            source,
        };
        let mut file = fs::File::create(&temp_path).map_err(write_error)?;
        file.write_all(contents.as_bytes()).map_err(write_error)?;
        file.sync_all().map_err(write_error)?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.file.sources
    }

    /// Configured default log level, if any.
    pub fn log_level(&self) -> Option<&str> {
        self.file.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    /// Type reported when no MIME detector recognizes content.
    pub fn default_mime_type(&self) -> Option<&str> {
        self.file.mime.as_ref().and_then(|m| m.default_type.as_deref())
    }

    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(vars: &[(&str, PathBuf)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.display().to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const ALPHA: &str = "[[source]]\nname = \"alpha\"\nconnector = \"memory\"\n";

    #[test]
    fn load_empty_defaults() {
        let home = TempDir::new().unwrap();
        let result = Config::load_with(None, env_of(&[]), Some(home.path().to_path_buf())).unwrap();
        assert!(result.config.sources().is_empty());
        assert!(result.config.loaded_from().is_none());
        assert_eq!(
            result.config.target(),
            Some(home.path().join(".repofed/config.toml").as_path())
        );
    }

    #[test]
    fn explicit_path_wins() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("explicit.toml");
        let env_file = temp.path().join("env.toml");
        fs::write(&explicit, ALPHA).unwrap();
        fs::write(&env_file, "").unwrap();

        let result =
            Config::load_with(Some(&explicit), env_of(&[(CONFIG_ENV, env_file)]), None).unwrap();
        assert_eq!(result.config.sources().len(), 1);
        assert_eq!(result.config.loaded_from(), Some(explicit.as_path()));
    }

    #[test]
    fn env_then_xdg_then_home() {
        let temp = TempDir::new().unwrap();
        let xdg = temp.path().join("xdg");
        fs::create_dir_all(xdg.join("repofed")).unwrap();
        fs::write(xdg.join("repofed/config.toml"), ALPHA).unwrap();

        let result = Config::load_with(
            None,
            env_of(&[("XDG_CONFIG_HOME", xdg.clone())]),
            Some(temp.path().join("home")),
        )
        .unwrap();
        assert_eq!(result.config.sources()[0].name, "alpha");

        let env_file = temp.path().join("env.toml");
        fs::write(&env_file, "[logging]\nlevel = \"debug\"\n").unwrap();
        let result = Config::load_with(
            None,
            env_of(&[(CONFIG_ENV, env_file), ("XDG_CONFIG_HOME", xdg)]),
            None,
        )
        .unwrap();
        assert_eq!(result.config.log_level(), Some("debug"));
        assert!(result.config.sources().is_empty());
    }

    #[test]
    fn missing_env_file_warns() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_with(
            None,
            env_of(&[(CONFIG_ENV, temp.path().join("gone.toml"))]),
            Some(temp.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains(CONFIG_ENV));
    }

    #[test]
    fn invalid_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[[source]]\nname = \"x\"\nconnector = \"webdav\"\n").unwrap();
        assert!(matches!(
            Config::load_with(Some(&path), env_of(&[]), None),
            Err(ConfigError::InvalidValue(_))
        ));

        fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(
            Config::load_with(Some(&path), env_of(&[]), None),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn save_roundtrip_is_atomic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        let mut config = Config::load_with(Some(&path), env_of(&[]), None).unwrap().config;
        assert!(config.loaded_from().is_none());

        config.file.sources.push(SourceConfig::new("alpha", "memory"));
        let written = config.save().unwrap();
        assert_eq!(written, path);
        assert!(!path.with_extension("toml.tmp").exists());

        let reloaded = Config::load_with(Some(&path), env_of(&[]), None).unwrap().config;
        assert_eq!(reloaded.sources(), config.sources());
    }

    #[test]
    fn save_rejects_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut config = Config::load_with(Some(&path), env_of(&[]), None).unwrap().config;
        config.file.sources.push(SourceConfig::new("alpha", "memory"));
        config.file.sources.push(SourceConfig::new("alpha", "memory"));
        assert!(config.save().is_err());
        assert!(!path.exists());
    }
}
