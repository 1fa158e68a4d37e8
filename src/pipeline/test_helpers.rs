//! Shared fixtures for pipeline and API tests
//!
//! Provides an in-memory decryptor and transcoder so the pipeline can be
//! exercised without real binaries, plus canned uploads in the fake's
//! "container" format.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::config::Config;
use crate::decrypt::ContainerDecryptor;
use crate::error::{ConvertError, Error};
use crate::pipeline::ConvertService;
use crate::scratch::SequentialNames;
use crate::transcode::Transcoder;
use crate::types::UploadRef;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Signature the fake decryptor expects at the front of every "encrypted"
/// upload; everything after it is the decoded payload.
pub(crate) const FAKE_SIGNATURE: &[u8] = b"LOCKED::";

/// Payload marker that makes the fake decryptor fail mid-stream
pub(crate) const POISON: &[u8] = b"POISON";

/// A decoded payload that is already FLAC
pub(crate) const FLAC_PAYLOAD: &[u8] = b"fLaC\x00\x00\x00\x22 pretend frames follow";

/// A decoded payload that is ID3-tagged MP3
pub(crate) const MP3_PAYLOAD: &[u8] = b"ID3\x04\x00\x00 pretend mpeg frames follow";

/// Wrap a payload in the fake container format
pub(crate) fn locked(payload: &[u8]) -> Vec<u8> {
    let mut data = FAKE_SIGNATURE.to_vec();
    data.extend_from_slice(payload);
    data
}

/// An upload whose decoded payload is already FLAC
pub(crate) fn flac_upload(name: &str) -> UploadRef {
    UploadRef::new(name, locked(FLAC_PAYLOAD))
}

/// An upload whose decoded payload is ID3-tagged MP3
pub(crate) fn mp3_upload(name: &str) -> UploadRef {
    UploadRef::new(name, locked(MP3_PAYLOAD))
}

/// An upload that is not an encrypted container at all
pub(crate) fn garbage_upload(name: &str) -> UploadRef {
    UploadRef::new(name, b"just some random bytes".to_vec())
}

/// Decryptor fake speaking the `LOCKED::` container format
pub(crate) struct FakeDecryptor;

#[async_trait]
impl ContainerDecryptor for FakeDecryptor {
    async fn validate(&self, input: &Path) -> crate::Result<()> {
        let bytes = tokio::fs::read(input).await?;
        if bytes.starts_with(FAKE_SIGNATURE) {
            Ok(())
        } else {
            Err(Error::Convert(ConvertError::NotAValidContainer {
                reason: "missing fake signature".to_string(),
            }))
        }
    }

    async fn decrypt(&self, input: &Path, output: &Path) -> crate::Result<()> {
        self.validate(input).await?;
        let bytes = tokio::fs::read(input).await?;
        let payload = &bytes[FAKE_SIGNATURE.len()..];
        if payload.starts_with(POISON) {
            return Err(Error::Convert(ConvertError::DecryptFailed {
                reason: "stream failed mid-decode".to_string(),
            }));
        }
        tokio::fs::write(output, payload).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-decryptor"
    }
}

/// Transcoder fake that records every invocation and emits a FLAC-looking
/// stream
#[derive(Default)]
pub(crate) struct RecordingTranscoder {
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    fail: bool,
}

impl RecordingTranscoder {
    pub(crate) fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> crate::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), output.to_path_buf()));
        if self.fail {
            return Err(Error::Convert(ConvertError::TranscodeFailed {
                reason: "fake encoder rejected the input".to_string(),
            }));
        }
        let payload = tokio::fs::read(input).await?;
        let mut flac = b"fLaC".to_vec();
        flac.extend_from_slice(&payload);
        tokio::fs::write(output, flac).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-transcoder"
    }
}

/// A service wired to the fakes, plus handles for assertions
pub(crate) struct TestService {
    pub(crate) service: Arc<ConvertService>,
    pub(crate) transcoder: Arc<RecordingTranscoder>,
    pub(crate) scratch: TempDir,
}

impl TestService {
    /// Entries remaining directly under the scratch root
    pub(crate) fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

/// Build a test service over a fresh scratch directory
pub(crate) fn create_test_service(config: Config) -> TestService {
    create_test_service_with(config, RecordingTranscoder::default())
}

/// Build a test service with an explicit transcoder fake
pub(crate) fn create_test_service_with(
    mut config: Config,
    transcoder: RecordingTranscoder,
) -> TestService {
    let scratch = TempDir::new().unwrap();
    config.scratch_dir = Some(scratch.path().to_path_buf());

    let transcoder = Arc::new(transcoder);
    let service = Arc::new(ConvertService::with_components(
        Arc::new(config),
        Arc::new(FakeDecryptor),
        transcoder.clone(),
        Arc::new(SequentialNames::new()),
    ));

    TestService {
        service,
        transcoder,
        scratch,
    }
}
