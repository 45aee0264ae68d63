//! Configuration system for dsmrlink.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $DSMRLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/dsmrlink/config.toml
//!   3. ~/.config/dsmrlink/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::id::TAG_LEN;
use crate::reassembly::DEFAULT_MAX_PENDING;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DsmrConfig {
    pub source: SourceConfig,
    pub reassembly: ReassemblyConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Serial device or file to read raw P1 output from. "-" = stdin.
    pub path: String,
    /// Producer tag embedded in every identifier, as 8 hex characters.
    pub tag: String,
    /// Bytes requested per read. Each read becomes one chunk.
    pub read_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassemblyConfig {
    /// Chunks to buffer without a boundary before discarding the oldest.
    pub max_pending: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File that reassembled telegrams are appended to, wire-encoded.
    pub path: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB0".to_string(),
            tag: "00000001".to_string(),
            read_buffer: 1024,
        }
    }
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("telegrams.bin"),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("dsmrlink")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("dsmrlink")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("source tag {0:?} must be {} hex characters", TAG_LEN * 2)]
    InvalidTag(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl DsmrConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::parse(&path, &text)?
        } else {
            DsmrConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse TOML text. `path` is only used in error messages.
    pub fn parse(path: &std::path::Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("DSMRLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&DsmrConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply DSMRLINK_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DSMRLINK_SOURCE__PATH") {
            self.source.path = v;
        }
        if let Ok(v) = std::env::var("DSMRLINK_SOURCE__TAG") {
            self.source.tag = v;
        }
        if let Ok(v) = std::env::var("DSMRLINK_OUTPUT__PATH") {
            self.output.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DSMRLINK_REASSEMBLY__MAX_PENDING") {
            match v.parse() {
                Ok(n) => self.reassembly.max_pending = n,
                Err(e) => tracing::warn!(
                    value = %v,
                    error = %e,
                    "ignoring DSMRLINK_REASSEMBLY__MAX_PENDING"
                ),
            }
        }
    }
}

impl SourceConfig {
    /// Decode the configured producer tag.
    pub fn tag_bytes(&self) -> Result<[u8; TAG_LEN], ConfigError> {
        let mut tag = [0u8; TAG_LEN];
        hex::decode_to_slice(self.tag.trim(), &mut tag)
            .map_err(|_| ConfigError::InvalidTag(self.tag.clone()))?;
        Ok(tag)
    }
}
