use std::sync::Arc;

use crate::config::Config;
use crate::processing::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let orchestrator = Orchestrator::new(&config);
        Self::with_orchestrator(config, orchestrator)
    }

    /// Build state around an already assembled orchestrator.
    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
