use std::sync::Arc;

use crate::config::Config;
use crate::storage::ObjectStore;

/// Shared, read-only state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub bucket: String,
    pub provider: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
