use std::sync::Arc;

use crate::chat::dispatch::Deps;
use crate::config::Config;
use crate::session::registry::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Dispatch collaborators (store, job provider, oracles, LLM client).
    pub deps: Deps,
    pub sessions: Arc<SessionRegistry>,
    pub config: Config,
}
