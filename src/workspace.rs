//! Request-scoped workspace directory
//!
//! Every conversion request owns exactly one [`RequestWorkspace`]: a fresh
//! directory holding the converted outputs and the optional result archive.
//! It is created before the first file is processed and recursively removed
//! exactly once when the owner lets go of it, whichever exit path that
//! happens on.

use crate::error::{Error, Result};
use crate::scratch::NameGenerator;
use std::path::{Path, PathBuf};

/// A directory that exclusively owns a request's artifacts
///
/// Removal happens in `Drop`, so an early return, a conversion error, or a
/// client abort all tear the workspace down. Pipelines borrow the workspace;
/// only the orchestrator (and later the response body guard) ever owns it.
#[derive(Debug)]
pub struct RequestWorkspace {
    path: PathBuf,
    released: bool,
}

impl RequestWorkspace {
    /// Create `<root>/kgm2flac_<hex8>` and take ownership of it
    pub fn create(root: &Path, names: &dyn NameGenerator) -> Result<Self> {
        let path = root.join(format!("kgm2flac_{}", names.hex(8)));
        std::fs::create_dir_all(&path).map_err(|e| Error::WorkspaceCreateFailed {
            reason: e.to_string(),
        })?;
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Workspace directory path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join a file name onto the workspace directory
    #[must_use]
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Recursively remove the workspace
    ///
    /// Safe to call more than once; an already-removed directory is not an
    /// error.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove request workspace");
        }
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        self.release();
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::RandomNames;
    use tempfile::TempDir;

    #[test]
    fn create_makes_a_directory_under_the_root() {
        let root = TempDir::new().unwrap();
        let ws = RequestWorkspace::create(root.path(), &RandomNames).unwrap();

        assert!(ws.path().is_dir());
        assert!(ws.path().starts_with(root.path()));
        let name = ws.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("kgm2flac_"));
    }

    #[test]
    fn drop_removes_the_directory_and_its_contents() {
        let root = TempDir::new().unwrap();
        let path = {
            let ws = RequestWorkspace::create(root.path(), &RandomNames).unwrap();
            std::fs::write(ws.join("a.flac"), b"x").unwrap();
            std::fs::write(ws.join("result.zip"), b"y").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists(), "drop must remove the workspace recursively");
    }

    #[test]
    fn release_is_idempotent() {
        let root = TempDir::new().unwrap();
        let mut ws = RequestWorkspace::create(root.path(), &RandomNames).unwrap();
        let path = ws.path().to_path_buf();

        ws.release();
        assert!(!path.exists());
        ws.release();
        ws.release();
    }

    #[test]
    fn create_fails_cleanly_under_an_unwritable_root() {
        let err =
            RequestWorkspace::create(Path::new("/proc/kgm2flac-no-such-root"), &RandomNames)
                .unwrap_err();
        match err {
            Error::WorkspaceCreateFailed { .. } => {}
            other => panic!("expected WorkspaceCreateFailed, got {other:?}"),
        }
    }

    #[test]
    fn two_workspaces_do_not_collide() {
        let root = TempDir::new().unwrap();
        let a = RequestWorkspace::create(root.path(), &RandomNames).unwrap();
        let b = RequestWorkspace::create(root.path(), &RandomNames).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
