use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use crate::error_handling::types::ConfigError;
use crate::expiry::policy::ExpirySelection;

/// Which persistence backend backs the photo store.
///
/// `Sqlite` is the canonical transactional backend; `File` keeps the whole
/// record set in a single JSON blob and is only safe with one writer at a
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    File,
}

/// Application configuration, read from a TOML file with command-line
/// arguments taking precedence.
///
/// # Fields Overview
///
/// - `backend`: which storage backend to open
/// - `storage_path`: directory holding the photo store; when absent the
///   backends fall back to `EPHEMERA_STORAGE_DIR`, then the current
///   directory
/// - `default_expiry`: lifetime used by `capture` when the user does not
///   pick one explicitly
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    #[serde(default = "default_expiry")]
    pub default_expiry: ExpirySelection,
}

fn default_backend() -> BackendKind {
    BackendKind::Sqlite
}

fn default_expiry() -> ExpirySelection {
    ExpirySelection::OneHour
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            storage_path: None,
            default_expiry: default_expiry(),
        }
    }
}

impl Config {
    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}
