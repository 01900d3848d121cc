//! Scoped working directory for intermediate encodes.
//!
//! The directory is created by [`Workspace::create`] and removed when the
//! guard is dropped, whichever way the owning scope is left (normal return,
//! `?` propagation, or an unwinding panic). Removal is best effort.
//!
//! Only directories this tool created are ever removed. A new workspace gets
//! an ownership marker; an existing directory is reused only when it carries
//! that marker (left behind by an interrupted run) and refused otherwise.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{OarError, Result};

pub const DEFAULT_WORK_DIR: &str = ".oar_tmp";

/// Present in every directory created by [`Workspace::create`].
pub const WORKSPACE_MARKER: &str = ".oar_workspace";

const ARTIFACT_STEM: &str = "tmp";

#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let workspace_error = |source: io::Error| OarError::WorkspaceError {
            path: dir.clone(),
            source,
        };

        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(workspace_error)?;
        }

        match fs::create_dir(&dir) {
            Ok(()) => debug!(dir = %dir.display(), "Workspace created"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if !dir.join(WORKSPACE_MARKER).is_file() {
                    return Err(workspace_error(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "path already exists and is not an oar working directory",
                    )));
                }
                debug!(dir = %dir.display(), "Reusing workspace left by an earlier run");
            }
            Err(e) => return Err(workspace_error(e)),
        }

        let guard = Self { dir };
        fs::write(guard.dir.join(WORKSPACE_MARKER), b"").map_err(|source| {
            OarError::WorkspaceError {
                path: guard.dir.clone(),
                source,
            }
        })?;
        Ok(guard)
    }

    /// The single file every encode overwrites, e.g. `.oar_tmp/tmp.ogg`.
    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", ARTIFACT_STEM, extension))
    }

    /// Moves `artifact` to `destination`. Falls back to copy + remove when a
    /// plain rename is impossible (e.g. across filesystems).
    pub fn persist(&self, artifact: &Path, destination: &Path) -> Result<()> {
        let move_error = |source: io::Error| OarError::OutputMoveError {
            from: artifact.to_path_buf(),
            to: destination.to_path_buf(),
            source,
        };

        match fs::rename(artifact, destination) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if !artifact.is_file() {
                    return Err(move_error(rename_err));
                }
                debug!(error = %rename_err, "Rename failed, copying artifact instead");
                fs::copy(artifact, destination).map_err(move_error)?;
                let _ = fs::remove_file(artifact);
                Ok(())
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(dir = %self.dir.display(), "Workspace removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to remove workspace"),
        }
    }
}
