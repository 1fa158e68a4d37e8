//! Result archive building
//!
//! Packs every successful conversion into one deflate-compressed zip inside
//! the workspace. Archive assembly is all-or-nothing: any failure while
//! adding an entry fails the build, and no partial archive is ever handed
//! out.

use crate::error::{Error, Result};
use crate::scratch::NameGenerator;
use crate::types::ConversionOutcome;
use crate::workspace::RequestWorkspace;
use std::io::Write;
use std::path::PathBuf;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Build `kgm2flac_result_<hex8>.zip` in the workspace from all successful
/// outcomes
///
/// Entry names are the output files' basenames; failed outcomes are skipped.
/// Entry order is not guaranteed and must not be relied upon.
///
/// # Errors
///
/// Returns [`Error::ArchiveBuildFailed`] if the archive file cannot be
/// created or any entry cannot be written.
pub fn build_result_archive(
    outcomes: &[ConversionOutcome],
    workspace: &RequestWorkspace,
    names: &dyn NameGenerator,
) -> Result<PathBuf> {
    let zip_path = workspace.join(&format!("kgm2flac_result_{}.zip", names.hex(8)));

    let file = std::fs::File::create(&zip_path).map_err(|e| Error::ArchiveBuildFailed {
        reason: format!("cannot create archive file: {e}"),
    })?;
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for outcome in outcomes {
        let Some(output) = outcome.output.as_ref() else {
            continue;
        };

        let entry_name = output
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::ArchiveBuildFailed {
                reason: format!("output path {} has no usable name", output.display()),
            })?;

        writer
            .start_file(entry_name, options)
            .map_err(|e| Error::ArchiveBuildFailed {
                reason: format!("cannot start entry {entry_name}: {e}"),
            })?;

        let mut input = std::fs::File::open(output).map_err(|e| Error::ArchiveBuildFailed {
            reason: format!("cannot open {}: {e}", output.display()),
        })?;
        std::io::copy(&mut input, &mut writer).map_err(|e| Error::ArchiveBuildFailed {
            reason: format!("cannot write entry {entry_name}: {e}"),
        })?;
    }

    let mut file = writer.finish().map_err(|e| Error::ArchiveBuildFailed {
        reason: format!("cannot finalize archive: {e}"),
    })?;
    file.flush().map_err(|e| Error::ArchiveBuildFailed {
        reason: format!("cannot flush archive: {e}"),
    })?;

    Ok(zip_path)
}
