//! Core types for kgm2flac

use crate::error::ConvertError;
use std::path::PathBuf;
use std::time::Duration;

/// A single uploaded file, parsed out of the multipart body
///
/// The bytes live in memory until the pipeline's persist stage writes the
/// only disk copy; the request-body cap bounds the total.
#[derive(Debug, Clone)]
pub struct UploadRef {
    /// Original filename as sent by the client
    pub file_name: String,
    /// Declared size in bytes (the length of the received field)
    pub size: u64,
    /// The raw encrypted container bytes
    pub data: Vec<u8>,
}

impl UploadRef {
    /// Create an upload reference from a received multipart field
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            size: data.len() as u64,
            data,
        }
    }
}

/// Per-file result of one pipeline run
///
/// Exactly one outcome exists per input file, produced in input order.
/// `output` and `error` are mutually exclusive: a success carries the
/// workspace output path, a failure carries the stage error.
#[derive(Debug)]
pub struct ConversionOutcome {
    /// Original upload filename
    pub file_name: String,
    /// Declared upload size in bytes
    pub size: u64,
    /// Path of the converted file inside the workspace (success only)
    pub output: Option<PathBuf>,
    /// The stage error (failure only)
    pub error: Option<ConvertError>,
    /// Wall-clock time spent on this file
    pub elapsed: Duration,
}

impl ConversionOutcome {
    /// Record a successful conversion
    pub fn success(upload: &UploadRef, output: PathBuf, elapsed: Duration) -> Self {
        Self {
            file_name: upload.file_name.clone(),
            size: upload.size,
            output: Some(output),
            error: None,
            elapsed,
        }
    }

    /// Record a failed conversion
    pub fn failure(upload: &UploadRef, error: ConvertError, elapsed: Duration) -> Self {
        Self {
            file_name: upload.file_name.clone(),
            size: upload.size,
            output: None,
            error: Some(error),
            elapsed,
        }
    }

    /// Whether this file converted successfully
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_ref_size_tracks_data_length() {
        let upload = UploadRef::new("song.kgm", vec![0u8; 128]);
        assert_eq!(upload.size, 128);
        assert_eq!(upload.file_name, "song.kgm");
    }

    #[test]
    fn success_outcome_has_output_and_no_error() {
        let upload = UploadRef::new("a.kgm", vec![1, 2, 3]);
        let outcome = ConversionOutcome::success(
            &upload,
            PathBuf::from("/work/a.flac"),
            Duration::from_millis(5),
        );

        assert!(outcome.is_success());
        assert_eq!(outcome.output.as_deref(), Some(std::path::Path::new("/work/a.flac")));
        assert!(outcome.error.is_none(), "success must not carry an error");
    }

    #[test]
    fn failure_outcome_has_error_and_no_output() {
        let upload = UploadRef::new("b.vpr", vec![]);
        let outcome = ConversionOutcome::failure(
            &upload,
            ConvertError::NotAValidContainer {
                reason: "bad magic".into(),
            },
            Duration::from_millis(1),
        );

        assert!(!outcome.is_success());
        assert!(outcome.output.is_none(), "failure must not carry an output");
        assert!(outcome.error.is_some());
    }
}
