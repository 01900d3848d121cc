//! Encoding at a given quality.
//!
//! The search only needs "encode this input at quality q and tell me where the
//! file went", so it talks to an [`Encoder`] rather than to ffmpeg. Tests
//! substitute an encoder that writes files of a known size.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use shared_utils::logging::log_external_tool;
use shared_utils::{format_ffmpeg_error, safe_path_arg, FfmpegProcess, OarError, Result};

pub trait Encoder {
    /// Encodes `input` at `quality`, overwriting the previous artifact.
    /// Returns the path of the artifact.
    fn encode(&mut self, input: &Path, quality: f64) -> Result<PathBuf>;
}

/// Runs `ffmpeg -q:a <quality>` into one fixed artifact path.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    artifact: PathBuf,
    codec: String,
}

impl FfmpegEncoder {
    pub fn new(artifact: impl AsRef<Path>, codec: &str) -> Self {
        Self {
            artifact: artifact.as_ref().to_path_buf(),
            codec: codec.to_string(),
        }
    }

    pub fn build_args(&self, input: &Path, quality: f64) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            safe_path_arg(input).into_owned(),
            "-vn".to_string(),
            "-c:a".to_string(),
            self.codec.clone(),
            "-q:a".to_string(),
            quality.to_string(),
            safe_path_arg(&self.artifact).into_owned(),
        ]
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&mut self, input: &Path, quality: f64) -> Result<PathBuf> {
        let args = self.build_args(input, quality);
        let mut cmd = Command::new("ffmpeg");
        cmd.args(&args);

        let start = Instant::now();
        let (status, stderr) = FfmpegProcess::spawn(&mut cmd)
            .and_then(FfmpegProcess::wait_with_output)
            .map_err(|e| OarError::EncodeError(format!("{:#}", e)))?;

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        log_external_tool("ffmpeg", &arg_refs, &stderr, status.code(), start.elapsed());

        if !status.success() {
            return Err(OarError::EncodeError(format!(
                "{} (exit code {})",
                format_ffmpeg_error(&stderr),
                status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "none".to_string())
            )));
        }

        if !self.artifact.is_file() {
            return Err(OarError::EncodeError(format!(
                "ffmpeg exited successfully but produced no file at {}",
                self.artifact.display()
            )));
        }

        Ok(self.artifact.clone())
    }
}
