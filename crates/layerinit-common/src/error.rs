//! Unified error type for the layerinit workspace.
//!
//! Every variant is fatal to the boot: the binary logs it with context and
//! exits non-zero. Soft-skips (absent overlay targets) are not errors.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum LayerInitError {
    /// A boot parameter could not be decoded into its option.
    #[error("failed to decode boot parameter {key}: {message}")]
    Decode {
        /// Normalised option key.
        key: String,
        /// Description of the decode failure.
        message: String,
    },

    /// A configuration value is invalid or missing.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A `mount(2)` call failed.
    #[error("failed to mount {device} ({fstype}) at {target}: {source}")]
    Mount {
        /// Mount source (device path or pseudo-filesystem name).
        device: String,
        /// Mountpoint.
        target: PathBuf,
        /// Filesystem type.
        fstype: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Replacing the process image with the real init failed.
    #[error("failed to execute {cmd}: {source}")]
    Exec {
        /// Executable that could not be started.
        cmd: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Serialization of the resolved options failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl LayerInitError {
    /// Builds a [`LayerInitError::Decode`] for `key`.
    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Builds a [`LayerInitError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LayerInitError>;
