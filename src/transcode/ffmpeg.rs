//! ffmpeg-based transcoder

use super::traits::Transcoder;
use crate::error::{ConvertError, Error};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Transcoder that executes the external `ffmpeg` binary
///
/// Invocation mirrors the flags a quiet batch conversion wants: no banner,
/// errors only, force-overwrite the destination, and `-map_metadata -1` so
/// the output carries no tags from the source.
///
/// Every invocation runs under a hard deadline; a child that outlives it is
/// killed and the conversion is reported as failed. The child is also killed
/// if the request is cancelled mid-conversion.
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
    timeout: Duration,
}

impl FfmpegTranscoder {
    /// Create a new transcoder with an explicit binary path
    pub fn new(binary_path: PathBuf, timeout: Duration) -> Self {
        Self {
            binary_path,
            timeout,
        }
    }

    /// Attempt to find `ffmpeg` in PATH
    ///
    /// Returns `Some(FfmpegTranscoder)` if the binary is found, `None`
    /// otherwise.
    pub fn from_path(timeout: Duration) -> Option<Self> {
        which::which("ffmpeg")
            .ok()
            .map(|path| Self::new(path, timeout))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> crate::Result<()> {
        let invocation = Command::new(&self.binary_path)
            .arg("-y")
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .args(["-map_metadata", "-1"])
            .arg(output)
            .kill_on_drop(true)
            .output();

        let child_output = match tokio::time::timeout(self.timeout, invocation).await {
            Ok(result) => result
                .map_err(|e| Error::ExternalTool(format!("failed to execute ffmpeg: {e}")))?,
            Err(_) => {
                return Err(Error::Convert(ConvertError::TranscodeFailed {
                    reason: format!("ffmpeg exceeded the {}s deadline", self.timeout.as_secs()),
                }));
            }
        };

        if !child_output.status.success() {
            let stderr = String::from_utf8_lossy(&child_output.stderr);
            return Err(Error::Convert(ConvertError::TranscodeFailed {
                reason: format!(
                    "ffmpeg exited with {}: {}",
                    child_output.status,
                    stderr.trim()
                ),
            }));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}
