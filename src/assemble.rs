//! Response-shape selection
//!
//! Given a batch's outcomes, decides what the client gets back: nothing
//! (every file failed), the single converted file, or an archive of all
//! successes. Three uploads with one success still yield a single-file
//! response, not an archive.

use crate::archive::build_result_archive;
use crate::error::{Error, Result};
use crate::scratch::NameGenerator;
use crate::types::ConversionOutcome;
use crate::utils::{replace_extension, sanitize_file_name};
use crate::workspace::RequestWorkspace;
use std::path::PathBuf;

/// Download filename used for every multi-file result
pub const ARCHIVE_DOWNLOAD_NAME: &str = "kgm2flac_result.zip";

/// What the HTTP layer should stream back for a finished batch
#[derive(Debug, PartialEq, Eq)]
pub enum BatchResponse {
    /// Exactly one file succeeded: stream it directly
    Single {
        /// Workspace path of the converted file
        path: PathBuf,
        /// Download filename, derived from the original upload name
        download_name: String,
    },
    /// More than one file succeeded: stream the result archive
    Archive {
        /// Workspace path of the built archive
        path: PathBuf,
    },
}

/// Pick the response shape for a finished batch
///
/// # Errors
///
/// - [`Error::BatchFailed`] when zero outcomes succeeded.
/// - [`Error::ArchiveBuildFailed`] when more than one succeeded but the
///   archive could not be assembled.
pub fn assemble_response(
    outcomes: &[ConversionOutcome],
    workspace: &RequestWorkspace,
    names: &dyn NameGenerator,
) -> Result<BatchResponse> {
    let successes: Vec<&ConversionOutcome> = outcomes.iter().filter(|o| o.is_success()).collect();

    match successes.as_slice() {
        [] => Err(Error::BatchFailed {
            attempted: outcomes.len(),
        }),
        [only] => {
            let path = only
                .output
                .clone()
                .ok_or_else(|| Error::BatchFailed {
                    attempted: outcomes.len(),
                })?;
            let download_name =
                replace_extension(&sanitize_file_name(&only.file_name), ".flac");
            Ok(BatchResponse::Single {
                path,
                download_name,
            })
        }
        _ => {
            let path = build_result_archive(outcomes, workspace, names)?;
            Ok(BatchResponse::Archive { path })
        }
    }
}
