//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`convert`] - Upload page and batch conversion
//! - [`system`] - Health and OpenAPI spec

mod convert;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use convert::*;
pub use system::*;
