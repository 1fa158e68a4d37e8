//! Trait for container decryption

use async_trait::async_trait;
use std::path::Path;

/// Interface to the external decryption capability
///
/// Implementations validate a file's container signature and stream-decode
/// its audio payload to an output file. The decode stream is finite, not
/// restartable, and may fail mid-stream; a failed decode leaves the output
/// file in an unspecified state, and the caller owns its cleanup.
///
/// # Errors
///
/// - `validate` returns `ConvertError::NotAValidContainer` for files without
///   a recognized signature.
/// - `decrypt` returns the same without attempting a decode, or
///   `ConvertError::DecryptFailed` when the decode stream fails.
/// - `Error::ExternalTool` signals the decryptor itself could not run.
#[async_trait]
pub trait ContainerDecryptor: Send + Sync {
    /// Check the container signature without decoding
    async fn validate(&self, input: &Path) -> crate::Result<()>;

    /// Validate, then stream-decode `input`'s payload into `output`
    async fn decrypt(&self, input: &Path, output: &Path) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
