use std::path::PathBuf;
use thiserror::Error;

use crate::ffprobe::FFprobeError;
use crate::types::IterationError;

#[derive(Error, Debug)]
pub enum OarError {
    #[error(
        "Minimum allowed bitrate is {} kbps. '{}' has {:.3} kbps",
        *min_bps / 1000.0,
        path.display(),
        bitrate_bps / 1000.0
    )]
    InputBitrateTooLow {
        path: PathBuf,
        bitrate_bps: f64,
        min_bps: f64,
    },

    #[error("FFprobe failed: {0}")]
    ProbeError(String),

    #[error("Cannot access file '{}': {source}", path.display())]
    FileAccessError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("FFmpeg failed: {0}")]
    EncodeError(String),

    #[error("Error moving output file '{}' to '{}': {source}", from.display(), to.display())]
    OutputMoveError {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error creating working directory '{}': {source}", path.display())]
    WorkspaceError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error(
        "Target bitrate {:.0} bps is unreachable: lowest probe gives {:.0} bps at quality {}",
        target_bps,
        bitrate_bps,
        quality
    )]
    TargetUnreachable {
        quality: f64,
        bitrate_bps: f64,
        target_bps: f64,
    },

    /// The accepted quality measured under the target during the search but
    /// not when encoded again.
    #[error(
        "Re-encode at quality {} gave {:.0} bps, above the target {:.0} bps",
        quality,
        bitrate_bps,
        target_bps
    )]
    ReencodeOverTarget {
        quality: f64,
        bitrate_bps: f64,
        target_bps: f64,
    },

    #[error(transparent)]
    IterationLimitExceeded(#[from] IterationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<FFprobeError> for OarError {
    fn from(e: FFprobeError) -> Self {
        match e {
            FFprobeError::ToolNotFound(s) => OarError::ToolNotFound(s),
            other => OarError::ProbeError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OarError>;
