//! Batch conversion pipeline
//!
//! [`ConvertService`] orchestrates one request's uploads: it validates the
//! batch, creates the request workspace, and runs every file through the
//! fixed per-file stage sequence (size check, persist, decrypt, sniff,
//! materialize). Files are processed sequentially in input order; one file's
//! failure never stops or corrupts the rest of the batch.
//!
//! Each stage owns exactly one scratch resource at a time and hands it off or
//! releases it before advancing, so a failure at any stage leaks nothing from
//! the stages before it.

use crate::config::Config;
use crate::decrypt::{CliDecryptor, ContainerDecryptor};
use crate::error::{ConvertError, Error, Result};
use crate::scratch::{NameGenerator, RandomNames, TemporaryResource};
use crate::sniff::{AudioFormat, SNIFF_LEN, sniff};
use crate::transcode::{FfmpegTranscoder, Transcoder};
use crate::types::{ConversionOutcome, UploadRef};
use crate::utils::{replace_extension, sanitize_file_name};
use crate::workspace::RequestWorkspace;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// The batch conversion service
///
/// Holds the configuration and the external capabilities (decryptor,
/// transcoder) behind trait objects, so the pipeline runs the same against
/// real binaries or in-memory fakes.
pub struct ConvertService {
    config: Arc<Config>,
    decryptor: Arc<dyn ContainerDecryptor>,
    transcoder: Arc<dyn Transcoder>,
    names: Arc<dyn NameGenerator>,
}

impl ConvertService {
    /// Create a service from configuration, discovering external binaries
    ///
    /// Explicit tool paths win; otherwise PATH is searched when
    /// `tools.search_path` is enabled.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for invalid settings and `ExternalTool` when
    /// a required binary cannot be found.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_secs(config.tools.transcode_timeout_secs);

        let decryptor: Arc<dyn ContainerDecryptor> = match &config.tools.decryptor_path {
            Some(path) => Arc::new(CliDecryptor::new(path.clone())),
            None if config.tools.search_path => Arc::new(CliDecryptor::from_path().ok_or_else(
                || Error::ExternalTool("decryptor binary (um) not found in PATH".to_string()),
            )?),
            None => {
                return Err(Error::Config {
                    message: "no decryptor path configured and PATH search is disabled"
                        .to_string(),
                    key: Some("tools.decryptor_path".to_string()),
                });
            }
        };

        let transcoder: Arc<dyn Transcoder> = match &config.tools.ffmpeg_path {
            Some(path) => Arc::new(FfmpegTranscoder::new(path.clone(), timeout)),
            None if config.tools.search_path => {
                Arc::new(FfmpegTranscoder::from_path(timeout).ok_or_else(|| {
                    Error::ExternalTool("ffmpeg not found in PATH".to_string())
                })?)
            }
            None => {
                return Err(Error::Config {
                    message: "no ffmpeg path configured and PATH search is disabled".to_string(),
                    key: Some("tools.ffmpeg_path".to_string()),
                });
            }
        };

        Ok(Self {
            config,
            decryptor,
            transcoder,
            names: Arc::new(RandomNames),
        })
    }

    /// Create a service with explicit components
    ///
    /// Used by tests and embedders that bring their own decryptor,
    /// transcoder, or name source.
    pub fn with_components(
        config: Arc<Config>,
        decryptor: Arc<dyn ContainerDecryptor>,
        transcoder: Arc<dyn Transcoder>,
        names: Arc<dyn NameGenerator>,
    ) -> Self {
        Self {
            config,
            decryptor,
            transcoder,
            names,
        }
    }

    /// The service's configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The service's name generator, shared with archive building
    #[must_use]
    pub fn names(&self) -> &dyn NameGenerator {
        self.names.as_ref()
    }

    /// Run a whole batch through the pipeline
    ///
    /// Rejects oversized batches before producing any outcome; otherwise
    /// creates the request workspace and converts every file sequentially,
    /// returning exactly one outcome per upload in input order. The returned
    /// workspace owns every produced artifact; dropping it removes them.
    ///
    /// # Errors
    ///
    /// - [`Error::BatchTooLarge`] when the file count exceeds the limit.
    /// - [`Error::WorkspaceCreateFailed`] when the workspace cannot be made.
    pub async fn run_batch(
        &self,
        uploads: &[UploadRef],
    ) -> Result<(RequestWorkspace, Vec<ConversionOutcome>)> {
        let limit = self.config.limits.max_files;
        if uploads.len() > limit {
            return Err(Error::BatchTooLarge {
                count: uploads.len(),
                limit,
            });
        }

        let workspace = RequestWorkspace::create(&self.config.scratch_root(), self.names())?;
        debug!(workspace = %workspace.path().display(), files = uploads.len(), "created request workspace");

        let mut outcomes = Vec::with_capacity(uploads.len());
        for upload in uploads {
            outcomes.push(self.process_one(upload, &workspace).await);
        }

        Ok((workspace, outcomes))
    }

    /// Convert a single upload, recording the result as an outcome
    ///
    /// Never fails the caller: every error is captured into the returned
    /// outcome.
    pub async fn process_one(
        &self,
        upload: &UploadRef,
        workspace: &RequestWorkspace,
    ) -> ConversionOutcome {
        let started = Instant::now();

        match self.convert_file(upload, workspace).await {
            Ok(output) => {
                let outcome = ConversionOutcome::success(upload, output, started.elapsed());
                info!(
                    file = %upload.file_name,
                    size = upload.size,
                    output = %outcome.output.as_deref().unwrap_or(Path::new("")).display(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "file converted"
                );
                outcome
            }
            Err(error) => {
                warn!(
                    file = %upload.file_name,
                    size = upload.size,
                    error = %error,
                    "file conversion failed"
                );
                ConversionOutcome::failure(upload, error, started.elapsed())
            }
        }
    }

    /// The fixed per-file stage sequence
    async fn convert_file(
        &self,
        upload: &UploadRef,
        workspace: &RequestWorkspace,
    ) -> std::result::Result<PathBuf, ConvertError> {
        let scratch_root = self.config.scratch_root();

        // Stage 1: size check
        let limit = self.config.limits.max_file_size;
        if upload.size > limit {
            return Err(ConvertError::FileTooLarge {
                name: upload.file_name.clone(),
                size: upload.size,
                limit,
            });
        }

        // Stage 2: persist the upload outside the workspace, so a crash
        // mid-copy never pollutes workspace state
        let upload_ext = Path::new(&upload.file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut persisted =
            TemporaryResource::create_in(&scratch_root, "kgm", &upload_ext, self.names())
                .map_err(|e| ConvertError::PersistFailed {
                    reason: e.to_string(),
                })?;
        tokio::fs::write(persisted.path(), &upload.data)
            .await
            .map_err(|e| ConvertError::PersistFailed {
                reason: e.to_string(),
            })?;

        // Stage 3: decrypt into a fresh scratch file; the persisted upload is
        // done once decryption completes, success or failure
        let mut decoded =
            TemporaryResource::create_in(&scratch_root, "kgm_dec", ".bin", self.names())
                .map_err(|e| ConvertError::DecryptFailed {
                    reason: e.to_string(),
                })?;
        let decrypted = self
            .decryptor
            .decrypt(persisted.path(), decoded.path())
            .await;
        persisted.release();
        decrypted.map_err(|e| match e {
            Error::Convert(stage_error) => stage_error,
            other => ConvertError::DecryptFailed {
                reason: other.to_string(),
            },
        })?;

        // Stage 4: sniff the decoded stream's prefix
        let prefix = read_prefix(decoded.path()).await.map_err(|e| {
            ConvertError::UnknownAudioFormat {
                header: format!("unreadable: {e}"),
            }
        })?;
        let format = sniff(&prefix).ok_or_else(|| ConvertError::UnknownAudioFormat {
            header: hex_dump(&prefix),
        })?;

        // Stage 5: materialize into the workspace
        let final_name = replace_extension(&sanitize_file_name(&upload.file_name), ".flac");
        let final_path = workspace.join(&final_name);

        if format == AudioFormat::Flac {
            // Already in the target container: hand the file over as-is
            decoded
                .transfer_to(&final_path)
                .map_err(|e| ConvertError::MoveOrCopyFailed {
                    source_path: decoded.path().to_path_buf(),
                    dest_path: final_path.clone(),
                    reason: e.to_string(),
                })?;
        } else {
            let converted = self.transcoder.convert(decoded.path(), &final_path).await;
            decoded.release();
            converted.map_err(|e| match e {
                Error::Convert(stage_error) => stage_error,
                other => ConvertError::TranscodeFailed {
                    reason: other.to_string(),
                },
            })?;
        }

        Ok(final_path)
    }
}

/// Read up to [`SNIFF_LEN`] bytes from the start of a file
async fn read_prefix(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut prefix = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < prefix.len() {
        let n = file.read(&mut prefix[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    prefix.truncate(filled);
    Ok(prefix)
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
pub(crate) mod test_helpers;
