//! Application state for the API server

use crate::pipeline::ConvertService;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone); gives handlers access to the
/// conversion service and, through it, the configuration.
#[derive(Clone)]
pub struct AppState {
    /// The batch conversion service
    pub service: Arc<ConvertService>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<ConvertService>) -> Self {
        Self { service }
    }
}
