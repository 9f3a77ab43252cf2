use crate::config::schema::{FixerConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const LOCAL_CONFIG: &str = "normfix.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse config TOML ({}): {}", path.display(), source),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<FixerConfig, ConfigError> {
    let config: FixerConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

/// Load a config file. A relative header template resolves against the
/// file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<FixerConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = load_from_str(&contents).map_err(|error| error.with_path(path))?;

    if let (Some(template), Some(dir)) = (&config.header.template, path.parent()) {
        if template.is_relative() {
            config.header.template = Some(dir.join(template));
        }
    }
    Ok(config)
}

/// Candidate locations in lookup order, excluding an explicit `--config`.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(home) = home::home_dir() {
        paths.push(home.join(".config").join("normfix").join("config.toml"));
    }
    paths
}

/// Resolve the configuration: the explicit file if given (it must exist),
/// else the first existing file from [`search_paths`], else defaults.
pub fn discover(explicit: Option<&Path>) -> Result<FixerConfig, ConfigError> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading explicit config");
        return load_from_path(path);
    }
    discover_in(&search_paths())
}

fn discover_in(candidates: &[PathBuf]) -> Result<FixerConfig, ConfigError> {
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_from_path(path)
        }
        None => {
            debug!("no config file found, using defaults");
            Ok(FixerConfig::default())
        }
    }
}
