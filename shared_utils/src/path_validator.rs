//! Path comparison for request validation.
//!
//! Paths given on the command line may be relative, contain `.`/`..`, or go
//! through symlinks, and the output file usually does not exist yet. Both
//! checks here compare [`resolve_path`] forms instead of raw text.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Absolute, lexically normalized form of `path`, with its longest existing
/// ancestor canonicalized. Works for paths that do not exist yet.
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    let mut existing = normalized.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// True when `a` and `b` name the same file.
pub fn is_same_path(a: &Path, b: &Path) -> bool {
    resolve_path(a) == resolve_path(b)
}

/// True when `path` is `dir` itself or anything below it.
pub fn is_within(path: &Path, dir: &Path) -> bool {
    resolve_path(path).starts_with(resolve_path(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_normalizes_dots() {
        let root = TempDir::new().unwrap();
        let base = root.path().canonicalize().unwrap();
        fs::write(base.join("in.flac"), b"x").unwrap();

        assert_eq!(
            resolve_path(&base.join("./a/../in.flac")),
            base.join("in.flac")
        );
        assert_eq!(
            resolve_path(&base.join("missing/dir/out.ogg")),
            base.join("missing").join("dir").join("out.ogg")
        );
    }

    #[test]
    fn test_same_path_through_dots() {
        let root = TempDir::new().unwrap();
        let input = root.path().join("in.flac");
        fs::write(&input, b"x").unwrap();

        assert!(is_same_path(&input, &root.path().join(".").join("in.flac")));
        assert!(is_same_path(&input, &root.path().join("sub/../in.flac")));
        assert!(!is_same_path(&input, &root.path().join("out.ogg")));
    }

    #[cfg(unix)]
    #[test]
    fn test_same_path_through_symlink() {
        let root = TempDir::new().unwrap();
        let real = root.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("in.flac"), b"x").unwrap();
        std::os::unix::fs::symlink(&real, root.path().join("link")).unwrap();

        assert!(is_same_path(
            &real.join("in.flac"),
            &root.path().join("link").join("in.flac")
        ));
    }

    #[test]
    fn test_is_within() {
        let root = TempDir::new().unwrap();
        let work = root.path().join(".oar_tmp");

        assert!(is_within(&work.join("out.ogg"), &work));
        assert!(is_within(&work, &work));
        assert!(is_within(&root.path().join("x/../.oar_tmp/a.ogg"), &work));
        assert!(!is_within(&root.path().join("out.ogg"), &work));
        assert!(!is_within(&root.path().join(".oar_tmp2/out.ogg"), &work));
        assert!(is_within(&root.path().join("out.ogg"), root.path()));
    }
}
