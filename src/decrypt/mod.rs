//! Container decryption
//!
//! The decryption algorithm itself is an external capability; this module
//! defines the interface the pipeline talks to ([`ContainerDecryptor`]),
//! in-process container signature detection, and a CLI adapter that drives an
//! external decryptor binary.

mod cli;
mod container;
mod traits;

pub use cli::CliDecryptor;
pub use container::{ContainerKind, detect_container};
pub use traits::ContainerDecryptor;
