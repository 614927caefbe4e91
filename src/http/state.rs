use crate::session::{SessionConfig, SessionController, SessionDeps};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers.
///
/// Closed sessions stay in the map so their transcript, prompts, and
/// summary remain queryable after stop.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionController>>>>,
    pub session_config: SessionConfig,
    pub deps: SessionDeps,
}

impl AppState {
    pub fn new(session_config: SessionConfig, deps: SessionDeps) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_config,
            deps,
        }
    }
}
