//! Error types for kgm2flac
//!
//! This module provides the error handling for the library, including:
//! - Batch-level errors that abort a whole request
//! - Per-file conversion errors that are captured into outcomes
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for kgm2flac operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for kgm2flac
///
/// Batch-level variants abort the whole request. Per-file failures travel as
/// [`ConvertError`] inside a `ConversionOutcome` and never abort the batch;
/// the `Convert` variant exists so adapters can speak the same language.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_files")
        key: Option<String>,
    },

    /// The multipart request carried no files in the `files` field
    #[error("no files uploaded")]
    EmptyBatch,

    /// More files than the configured per-request maximum
    #[error("batch of {count} files exceeds the limit of {limit}")]
    BatchTooLarge {
        /// Number of files in the rejected batch
        count: usize,
        /// Configured maximum file count
        limit: usize,
    },

    /// Every file in the batch failed to convert
    #[error("all {attempted} files failed to convert")]
    BatchFailed {
        /// Number of files that were attempted
        attempted: usize,
    },

    /// The request-scoped workspace directory could not be created
    #[error("failed to create request workspace: {reason}")]
    WorkspaceCreateFailed {
        /// The underlying filesystem error
        reason: String,
    },

    /// The result archive could not be assembled
    #[error("failed to build result archive: {reason}")]
    ArchiveBuildFailed {
        /// What went wrong while writing the archive
        reason: String,
    },

    /// Per-file conversion error (captured into outcomes, never aborts a batch)
    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// External tool execution failed (ffmpeg, decryptor binary)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-file conversion errors
///
/// Exactly one of these is recorded in a failed file's outcome. Variant order
/// follows the pipeline stages.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// Upload exceeds the per-file size limit
    #[error("file {name} ({size} bytes) exceeds the per-file limit of {limit} bytes")]
    FileTooLarge {
        /// Original upload filename
        name: String,
        /// Declared upload size in bytes
        size: u64,
        /// Configured per-file limit in bytes
        limit: u64,
    },

    /// The upload could not be copied into scratch storage
    #[error("failed to persist upload: {reason}")]
    PersistFailed {
        /// The underlying I/O error
        reason: String,
    },

    /// The upload does not carry a KGM/KGMA/VPR container signature
    #[error("not a valid KGM/KGMA/VPR container: {reason}")]
    NotAValidContainer {
        /// Why validation rejected the file
        reason: String,
    },

    /// The container validated but the decode stream failed
    #[error("decryption failed: {reason}")]
    DecryptFailed {
        /// The decoder or subprocess error
        reason: String,
    },

    /// The decoded stream's prefix matches no known audio format
    #[error("unrecognized audio header: {header}")]
    UnknownAudioFormat {
        /// Hex dump of the sniffed prefix
        header: String,
    },

    /// The external transcoder failed to produce the target file
    #[error("transcode to FLAC failed: {reason}")]
    TranscodeFailed {
        /// The transcoder or subprocess error
        reason: String,
    },

    /// A decoded FLAC stream could not be moved or copied into the workspace
    #[error("failed to move {} to {}: {reason}", source_path.display(), dest_path.display())]
    MoveOrCopyFailed {
        /// The decoded intermediate path
        source_path: PathBuf,
        /// The intended workspace output path
        dest_path: PathBuf,
        /// The underlying filesystem error
        reason: String,
    },
}

/// API error response format
///
/// Returned by API endpoints when a request fails, with a machine-readable
/// code, a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "batch_too_large",
///     "message": "batch of 80 files exceeds the limit of 50",
///     "details": {
///       "file_count": 80,
///       "max_files": 50
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "batch_too_large")
    pub code: String,

    /// Human-readable error message, suitable for displaying to end users
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::EmptyBatch => 400,
            Error::BatchTooLarge { .. } => 400,
            Error::BatchFailed { .. } => 400,

            // 422 Unprocessable Entity - a single file that could not convert
            Error::Convert(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::WorkspaceCreateFailed { .. } => 500,
            Error::ArchiveBuildFailed { .. } => 500,
            Error::ApiServerError(_) => 500,
            Error::Io(_) => 500,

            // 503 Service Unavailable - External tool missing or broken
            Error::ExternalTool(_) => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::EmptyBatch => "empty_batch",
            Error::BatchTooLarge { .. } => "batch_too_large",
            Error::BatchFailed { .. } => "batch_failed",
            Error::WorkspaceCreateFailed { .. } => "workspace_create_failed",
            Error::ArchiveBuildFailed { .. } => "archive_build_failed",
            Error::Convert(e) => match e {
                ConvertError::FileTooLarge { .. } => "file_too_large",
                ConvertError::PersistFailed { .. } => "persist_failed",
                ConvertError::NotAValidContainer { .. } => "not_a_valid_container",
                ConvertError::DecryptFailed { .. } => "decrypt_failed",
                ConvertError::UnknownAudioFormat { .. } => "unknown_audio_format",
                ConvertError::TranscodeFailed { .. } => "transcode_failed",
                ConvertError::MoveOrCopyFailed { .. } => "move_or_copy_failed",
            },
            Error::ExternalTool(_) => "external_tool_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Io(_) => "io_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::BatchTooLarge { count, limit } => Some(serde_json::json!({
                "file_count": count,
                "max_files": limit,
            })),
            Error::BatchFailed { attempted } => Some(serde_json::json!({
                "attempted": attempted,
            })),
            Error::Convert(ConvertError::FileTooLarge { name, size, limit }) => {
                Some(serde_json::json!({
                    "file": name,
                    "size_bytes": size,
                    "limit_bytes": limit,
                }))
            }
            Error::Convert(ConvertError::UnknownAudioFormat { header }) => {
                Some(serde_json::json!({
                    "header": header,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
