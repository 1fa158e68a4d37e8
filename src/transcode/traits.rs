//! Trait for audio transcoding

use async_trait::async_trait;
use std::path::Path;

/// Interface to the external transcoding capability
///
/// Implementations convert a decoded audio file of a known non-FLAC format
/// into a FLAC file at `output`, stripping all metadata tags.
///
/// # Errors
///
/// - `ConvertError::TranscodeFailed` when the conversion fails or exceeds
///   its deadline.
/// - `Error::ExternalTool` when the encoder itself could not run.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` into a metadata-free FLAC file at `output`
    async fn convert(&self, input: &Path, output: &Path) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
