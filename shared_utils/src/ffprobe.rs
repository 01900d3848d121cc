//! FFprobe wrapper module
//!
//! Container-level probing for audio files. Only the `format` section of
//! ffprobe's JSON output is consumed; stream details are never needed to
//! compute an average bitrate.

use serde::Deserialize;
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use crate::logging::log_external_tool;

#[derive(Debug)]
pub enum FFprobeError {
    ToolNotFound(String),
    ExecutionFailed(String),
    ParseError(String),
    IoError(io::Error),
}

impl std::fmt::Display for FFprobeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FFprobeError::ToolNotFound(s) => write!(f, "Tool not found: {}", s),
            FFprobeError::ExecutionFailed(s) => write!(f, "FFprobe failed: {}", s),
            FFprobeError::ParseError(s) => write!(f, "Parse error: {}", s),
            FFprobeError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for FFprobeError {}

impl From<io::Error> for FFprobeError {
    fn from(e: io::Error) -> Self {
        FFprobeError::IoError(e)
    }
}

/// The `format` object of `ffprobe -show_format`, reduced to the duration.
/// Numeric values arrive as strings; other keys are ignored.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FfprobeFormat {
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

impl FfprobeFormat {
    /// Duration in seconds; must be finite and strictly positive.
    pub fn duration_secs(&self) -> Result<f64, FFprobeError> {
        let raw = self
            .duration
            .as_deref()
            .ok_or_else(|| FFprobeError::ParseError("format.duration is missing".to_string()))?;
        parse_duration(raw)
    }
}

pub fn parse_duration(raw: &str) -> Result<f64, FFprobeError> {
    let secs = raw.trim().parse::<f64>().map_err(|e| {
        FFprobeError::ParseError(format!("invalid duration '{}': {}", raw, e))
    })?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(FFprobeError::ParseError(format!(
            "duration must be positive, got '{}'",
            raw
        )));
    }
    Ok(secs)
}

pub fn parse_format_json(json: &str) -> Result<FfprobeFormat, FFprobeError> {
    let parsed: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| FFprobeError::ParseError(e.to_string()))?;
    parsed
        .format
        .ok_or_else(|| FFprobeError::ParseError("no format section in ffprobe output".to_string()))
}

pub fn is_ffprobe_available() -> bool {
    which::which("ffprobe").is_ok()
}

pub fn probe_format(path: &Path) -> Result<FfprobeFormat, FFprobeError> {
    if !is_ffprobe_available() {
        return Err(FFprobeError::ToolNotFound(
            "ffprobe not found. Install with: brew install ffmpeg".to_string(),
        ));
    }

    if !path.is_file() {
        return Err(FFprobeError::ExecutionFailed(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let path_str = path.to_str().ok_or_else(|| {
        FFprobeError::ExecutionFailed(format!("Invalid path encoding: {}", path.display()))
    })?;

    let args = [
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "--",
        path_str,
    ];
    let start = Instant::now();
    let output = Command::new("ffprobe").args(args).output()?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    log_external_tool("ffprobe", &args, &stderr, output.status.code(), start.elapsed());

    if !output.status.success() {
        let error_msg = if stderr.trim().is_empty() {
            format!(
                "ffprobe failed to analyze file: {} (exit code: {:?})",
                path.display(),
                output.status.code()
            )
        } else {
            format!("ffprobe error for '{}': {}", path.display(), stderr.trim())
        };
        return Err(FFprobeError::ExecutionFailed(error_msg));
    }

    parse_format_json(&String::from_utf8_lossy(&output.stdout))
}

pub fn get_duration(path: &Path) -> Result<f64, FFprobeError> {
    probe_format(path)?.duration_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "format": {
            "filename": "song.flac",
            "nb_streams": 1,
            "format_name": "flac",
            "duration": "215.146667",
            "size": "25104313",
            "bit_rate": "933466"
        }
    }"#;

    #[test]
    fn test_parse_format_json() {
        let format = parse_format_json(SAMPLE).unwrap();
        assert_eq!(format.duration.as_deref(), Some("215.146667"));
        assert!((format.duration_secs().unwrap() - 215.146667).abs() < 1e-9);
    }

    #[test]
    fn test_missing_duration() {
        let format = parse_format_json(r#"{"format":{"format_name":"ogg"}}"#).unwrap();
        assert!(matches!(
            format.duration_secs(),
            Err(FFprobeError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_format_section() {
        assert!(parse_format_json(r#"{"streams":[]}"#).is_err());
        assert!(parse_format_json("not json").is_err());
    }

    #[test]
    fn test_parse_duration_edge_cases() {
        assert_eq!(parse_duration("10").unwrap(), 10.0);
        assert_eq!(parse_duration(" 3.5\n").unwrap(), 3.5);
        for bad in ["", "N/A", "0", "0.000000", "-1.5", "inf", "NaN"] {
            assert!(parse_duration(bad).is_err(), "{:?} should be rejected", bad);
        }
    }
}
