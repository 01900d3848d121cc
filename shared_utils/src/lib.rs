//! Shared Utilities for the oar audio converter
//!
//! - Unified error type
//! - FFprobe wrapper (container duration)
//! - FFmpeg process wrapper (deadlock-free stderr handling)
//! - Bitrate measurement
//! - Scoped working directory
//! - Path comparison for request validation
//! - Iteration guard for open-ended searches
//! - Logging and terminal spinner

pub mod bitrate;
pub mod errors;
pub mod ffmpeg_process;
pub mod ffprobe;
pub mod logging;
pub mod path_validator;
pub mod progress;
pub mod types;
pub mod workspace;

pub use bitrate::{bitrate_bps, bitrate_from_size, format_kbps, BitrateProbe};
pub use errors::{OarError, Result};
pub use ffmpeg_process::{format_ffmpeg_error, is_ffmpeg_available, safe_path_arg, FfmpegProcess};
pub use ffprobe::{get_duration, is_ffprobe_available, FFprobeError, FfprobeFormat};
pub use path_validator::{is_same_path, is_within, resolve_path};
pub use progress::create_spinner;
pub use types::{IterationError, IterationGuard, DEFAULT_MAX_ITERATIONS};
pub use workspace::{Workspace, DEFAULT_WORK_DIR, WORKSPACE_MARKER};
