//! Average bitrate of a file on disk: `8 * size_bytes / duration_secs`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{OarError, Result};

/// Pure form of the measurement. `duration_secs` must be positive.
#[inline]
pub fn bitrate_from_size(size_bytes: u64, duration_secs: f64) -> f64 {
    debug_assert!(
        duration_secs > 0.0,
        "bitrate requested for non-positive duration {}",
        duration_secs
    );
    (size_bytes as f64 * 8.0) / duration_secs
}

/// Bitrate of the file at `path`, assuming it plays for `duration_secs`.
///
/// Callers get the duration from [`crate::ffprobe::get_duration`], which rejects
/// zero and negative values, so the division is always defined.
pub fn bitrate_bps(path: &Path, duration_secs: f64) -> Result<f64> {
    let size = fs::metadata(path)
        .map_err(|source| OarError::FileAccessError {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    Ok(bitrate_from_size(size, duration_secs))
}

pub fn format_kbps(bitrate_bps: f64) -> String {
    format!("{:.0} kbps", bitrate_bps / 1000.0)
}

/// One measurement of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct BitrateProbe {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub bitrate_bps: f64,
}

impl BitrateProbe {
    pub fn measure(path: &Path, duration_secs: f64) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            duration_secs,
            bitrate_bps: bitrate_bps(path, duration_secs)?,
        })
    }
}
