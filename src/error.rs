//! Error types for the external boundaries
//!
//! None of these are fatal to the kiosk: the sampling loop logs them and
//! carries on.

use std::path::PathBuf;

/// Talking to the recognition service failed
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("recognition request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("recognition service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// The capture source could not produce a frame
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture source not ready")]
    NotReady,

    #[error("failed to read frames from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no frames found in {0}")]
    Empty(PathBuf),
}

/// The persistence collaborator rejected a photo or rating
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("persistence request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("persistence service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no frame available for photo")]
    NoFrame,
}

/// Loading or validating the configuration failed
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error for the binary and the sampling loop lifecycle
#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("sampling loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("sampling loop is not available")]
    LoopUnavailable,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
