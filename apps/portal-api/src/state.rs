use std::sync::Arc;

use crate::config::Config;
use crate::filtering::orchestrator::FilteringOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<FilteringOrchestrator>,
    pub config: Config,
}
