//! Shared handler state

use std::sync::Arc;

use toolrelay_core::logging::Logger;
use toolrelay_core::{AgentService, ToolRegistry};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgentService>,
    pub logger: Arc<dyn Logger>,
}

impl AppState {
    pub fn new(service: Arc<AgentService>, logger: Arc<dyn Logger>) -> Self {
        Self { service, logger }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.service.registry()
    }
}
