//! Scratch file management
//!
//! [`TemporaryResource`] is a single named file with a guaranteed, idempotent
//! release: dropping it removes the file, releasing twice is a no-op, and
//! ownership can be transferred out (into a workspace) without a double
//! delete. Names come from an injected [`NameGenerator`] so tests never touch
//! real randomness.

use crate::error::{Error, Result};
use rand::RngCore;
use std::path::{Path, PathBuf};

/// Source of collision-resistant name suffixes for scratch files
///
/// Injected wherever temporary names are minted; production uses
/// [`RandomNames`], tests substitute deterministic sequences.
pub trait NameGenerator: Send + Sync {
    /// Produce `n` bytes of entropy rendered as lowercase hex (`2n` chars)
    fn hex(&self, n: usize) -> String;
}

/// Thread-local RNG backed name generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNames;

impl NameGenerator for RandomNames {
    fn hex(&self, n: usize) -> String {
        let mut bytes = vec![0u8; n];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A scratch file with exactly one owner and an idempotent release
///
/// The file is created empty on construction; `Drop` removes it unless
/// ownership was transferred away with [`transfer_to`](Self::transfer_to).
#[derive(Debug)]
pub struct TemporaryResource {
    path: PathBuf,
    armed: bool,
}

impl TemporaryResource {
    /// Create an empty scratch file `<dir>/<prefix>_<hex8><ext>`
    ///
    /// `ext` must include its leading dot, or be empty.
    pub fn create_in(
        dir: &Path,
        prefix: &str,
        ext: &str,
        names: &dyn NameGenerator,
    ) -> Result<Self> {
        let path = dir.join(format!("{prefix}_{}{ext}", names.hex(8)));
        std::fs::File::create(&path).map_err(Error::Io)?;
        Ok(Self { path, armed: true })
    }

    /// Path of the underlying file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the underlying file
    ///
    /// Safe to call any number of times; a missing file is not an error.
    pub fn release(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
        }
    }

    /// Move the file to `dest`, transferring ownership out of this resource
    ///
    /// Tries a rename first; across filesystem boundaries it falls back to
    /// copy-then-delete. On success the resource is disarmed and `dest` is
    /// owned by the caller. On failure the resource stays armed, so the
    /// scratch file is still released when it goes out of scope.
    pub fn transfer_to(&mut self, dest: &Path) -> std::io::Result<()> {
        match std::fs::rename(&self.path, dest) {
            Ok(()) => {
                self.armed = false;
                Ok(())
            }
            Err(_) => {
                std::fs::copy(&self.path, dest)?;
                self.release();
                Ok(())
            }
        }
    }
}

impl Drop for TemporaryResource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Deterministic generator for tests: 0000000000000001, 0000000000000002, ...
#[cfg(test)]
pub(crate) struct SequentialNames(std::sync::atomic::AtomicU64);

#[cfg(test)]
impl SequentialNames {
    pub(crate) fn new() -> Self {
        Self(std::sync::atomic::AtomicU64::new(0))
    }
}

#[cfg(test)]
impl NameGenerator for SequentialNames {
    fn hex(&self, n: usize) -> String {
        let next = self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("{next:0width$x}", width = n * 2)
    }
}
