//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use lettings_assistant::Assistant;
use lettings_core::config::LettingsConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The
/// configuration is immutable once the server starts.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LettingsConfig>,
    /// Shared by every connection; each connection keeps its own session.
    pub assistant: Arc<Assistant>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: LettingsConfig, assistant: Arc<Assistant>) -> Self {
        Self {
            config: Arc::new(config),
            assistant,
            start_time: Instant::now(),
        }
    }
}
