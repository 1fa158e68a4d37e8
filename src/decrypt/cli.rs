//! CLI-based decryptor driving an external binary

use super::container::{SIGNATURE_LEN, detect_container};
use super::traits::ContainerDecryptor;
use crate::error::{ConvertError, Error};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Decryptor that executes an external unlock binary
///
/// The binary is expected to take the encrypted input path and the raw output
/// path as positional arguments and exit non-zero on any decode failure
/// (the `um` CLI invocation contract). Container signatures are checked
/// in-process first, so an invalid file is rejected without spawning a
/// process.
///
/// The child is killed if the request is cancelled while a decode is in
/// flight.
pub struct CliDecryptor {
    binary_path: PathBuf,
}

impl CliDecryptor {
    /// Create a new CLI decryptor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `um` in PATH
    ///
    /// Returns `Some(CliDecryptor)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("um").ok().map(Self::new)
    }

    async fn read_signature(input: &Path) -> crate::Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(input).await.map_err(|e| {
            Error::Convert(ConvertError::NotAValidContainer {
                reason: format!("cannot open file: {e}"),
            })
        })?;

        let mut header = vec![0u8; SIGNATURE_LEN];
        let mut filled = 0;
        while filled < header.len() {
            let n = file.read(&mut header[filled..]).await.map_err(|e| {
                Error::Convert(ConvertError::NotAValidContainer {
                    reason: format!("cannot read header: {e}"),
                })
            })?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        header.truncate(filled);
        Ok(header)
    }
}

#[async_trait]
impl ContainerDecryptor for CliDecryptor {
    async fn validate(&self, input: &Path) -> crate::Result<()> {
        let header = Self::read_signature(input).await?;
        match detect_container(&header) {
            Some(_) => Ok(()),
            None => Err(Error::Convert(ConvertError::NotAValidContainer {
                reason: "no KGM/KGMA/VPR signature in header".to_string(),
            })),
        }
    }

    async fn decrypt(&self, input: &Path, output: &Path) -> crate::Result<()> {
        self.validate(input).await?;

        let child_output = Command::new(&self.binary_path)
            .arg(input)
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute decryptor: {e}")))?;

        if !child_output.status.success() {
            let stderr = String::from_utf8_lossy(&child_output.stderr);
            return Err(Error::Convert(ConvertError::DecryptFailed {
                reason: format!(
                    "decryptor exited with {}: {}",
                    child_output.status,
                    stderr.trim()
                ),
            }));
        }

        // A decoder that exits zero without producing output still failed
        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            Ok(_) => Err(Error::Convert(ConvertError::DecryptFailed {
                reason: "decryptor produced an empty stream".to_string(),
            })),
            Err(e) => Err(Error::Convert(ConvertError::DecryptFailed {
                reason: format!("decryptor produced no output: {e}"),
            })),
        }
    }

    fn name(&self) -> &'static str {
        "cli-um"
    }
}
