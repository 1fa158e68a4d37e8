//! # kgm2flac
//!
//! Batch conversion service that unlocks KGM/KGMA/VPR encrypted audio into
//! FLAC.
//!
//! ## Design Philosophy
//!
//! kgm2flac is designed to be:
//! - **Failure-isolating** - One bad file never spoils the rest of a batch
//! - **Leak-free** - Every temporary artifact is released on every exit path
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Fakeable** - Decryptor and transcoder sit behind traits, so the whole
//!   pipeline runs against in-memory fakes in tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use kgm2flac::{Config, ConvertService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let service = Arc::new(ConvertService::new(config)?);
//!
//!     // Serve until SIGTERM/SIGINT
//!     kgm2flac::run_with_shutdown(service).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Result archive building
pub mod archive;
/// Response-shape selection
pub mod assemble;
/// Configuration types
pub mod config;
/// Container decryption interface and CLI adapter
pub mod decrypt;
/// Error types
pub mod error;
/// Batch conversion pipeline
pub mod pipeline;
/// Scratch file management
pub mod scratch;
/// Audio format sniffing
pub mod sniff;
/// Transcoding interface and ffmpeg adapter
pub mod transcode;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;
/// Request-scoped workspace directory
pub mod workspace;

// Re-export commonly used types
pub use assemble::{ARCHIVE_DOWNLOAD_NAME, BatchResponse, assemble_response};
pub use config::{Config, LimitsConfig, ServerConfig, ToolsConfig};
pub use decrypt::{CliDecryptor, ContainerDecryptor, ContainerKind, detect_container};
pub use error::{ApiError, ConvertError, Error, ErrorDetail, Result, ToHttpStatus};
pub use pipeline::ConvertService;
pub use scratch::{NameGenerator, RandomNames, TemporaryResource};
pub use sniff::AudioFormat;
pub use transcode::{FfmpegTranscoder, Transcoder};
pub use types::{ConversionOutcome, UploadRef};
pub use workspace::RequestWorkspace;

use std::sync::Arc;

/// Serve the API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a Ctrl+C fallback if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight requests are dropped on shutdown; their workspaces and child
/// processes are torn down by the usual ownership rules.
pub async fn run_with_shutdown(service: Arc<ConvertService>) -> Result<()> {
    tokio::select! {
        result = api::start_api_server(service) => result,
        () = wait_for_signal() => {
            tracing::info!("Termination signal received, shutting down");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
