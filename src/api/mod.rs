pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::processing::IncidentProcessor;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<IncidentProcessor>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(processor: Arc<IncidentProcessor>) -> Self {
        Self {
            processor,
            started_at: Instant::now(),
        }
    }
}
