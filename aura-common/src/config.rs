//! Configuration loading and root folder resolution
//!
//! The data root folder is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `AURA_ROOT` environment variable
//! 3. TOML config file (`<config dir>/aura/config.toml`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is never fatal: the service logs a warning and
//! continues with compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data root folder
pub const ROOT_ENV_VAR: &str = "AURA_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "aura.db";

/// Optional settings loaded from `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Data root folder (overridden by CLI argument and environment)
    pub root_folder: Option<PathBuf>,
    /// Log level filter when `RUST_LOG` is unset
    pub log_level: Option<String>,
    /// Bearer access token for the remote video service
    pub youtube_access_token: Option<String>,
    /// Playlist naming overrides
    pub playlist: Option<PlaylistToml>,
    /// Outbound request throttle overrides
    pub throttle: Option<ThrottleToml>,
}

/// Playlist section of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistToml {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Throttle section of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThrottleToml {
    pub base_delay_ms: Option<u64>,
    pub large_batch_delay_ms: Option<u64>,
    pub large_batch_threshold: Option<usize>,
}

impl TomlConfig {
    /// Load the config file from the platform config directory
    ///
    /// Returns the default (empty) config when no file exists. A file
    /// that exists but fails to parse is a hard error so typos are not
    /// silently ignored.
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                tracing::warn!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load a config file from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        tracing::info!("Loaded config file: {}", path.display());
        Ok(config)
    }
}

/// Resolve the data root folder
///
/// `cli_arg` wins over the environment, which wins over the config file,
/// which wins over the compiled default.
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Create the root folder if missing and return the database path inside it
pub fn ensure_root_folder(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        std::fs::create_dir_all(root)?;
        tracing::info!("Created root folder: {}", root.display());
    }
    Ok(root.join(DATABASE_FILE))
}

/// Platform config file location (`<config dir>/aura/config.toml`)
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aura").join("config.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\aura
        dirs::data_local_dir()
            .map(|d| d.join("aura"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\aura"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/aura
        dirs::data_dir()
            .map(|d| d.join("aura"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/aura"))
    } else {
        // ~/.local/share/aura
        dirs::data_local_dir()
            .map(|d| d.join("aura"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/aura"))
    }
}
