//! FFmpeg process management
//!
//! ffmpeg writes its whole log to stderr. If stderr is piped but never read,
//! a long encode fills the pipe buffer (~64KB) and ffmpeg blocks forever.
//! [`FfmpegProcess`] drains stderr on a helper thread while the caller waits.
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::FfmpegProcess;
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.arg("-i").arg("input.flac").arg("output.ogg");
//! let (status, stderr) = FfmpegProcess::spawn(&mut cmd)?.wait_with_output()?;
//! ```

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

pub struct FfmpegProcess {
    child: Child,
    stderr_thread: Option<JoinHandle<String>>,
}

impl FfmpegProcess {
    /// Spawns `cmd` with stdin/stdout detached and stderr captured by a drain thread.
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        debug!(command = ?cmd, "Executing FFmpeg command");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn FFmpeg process")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture FFmpeg stderr"))?;

        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        Ok(Self {
            child,
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Blocks until the process exits. Returns its status and full stderr.
    pub fn wait_with_output(mut self) -> Result<(ExitStatus, String)> {
        let status = self.child.wait().context("Failed to wait for FFmpeg")?;
        let stderr = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();

        if status.success() {
            debug!(exit_code = status.code(), "FFmpeg process completed successfully");
        } else {
            error!(
                exit_code = status.code(),
                stderr_output = %stderr,
                "FFmpeg process failed"
            );
        }

        Ok((status, stderr))
    }
}

pub fn is_ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok()
}

/// Picks the most useful line of an ffmpeg log for an error message.
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error") || line.contains("Invalid"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("size=") && !line.starts_with("video:"))
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// ffmpeg has no `--` separator, so a relative path starting with `-`
/// would be read as an option. Such paths get a `./` prefix.
pub fn safe_path_arg(path: &Path) -> Cow<'_, str> {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        Cow::Owned(format!("./{}", s))
    } else {
        s
    }
}
