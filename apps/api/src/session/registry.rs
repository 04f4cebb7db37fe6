//! Session registry — one logical owner per conversation session.
//!
//! A dispatch holds its session's lock for the whole request, so two
//! concurrent requests for the same session can never interleave state
//! mutations. The second request gets `SessionBusy` instead of queueing;
//! the caller is expected to retry. Different sessions proceed in
//! parallel, each behind its own lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::errors::AppError;
use crate::session::state::ConversationState;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<ConversationState>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the session for exclusive use, creating it on first
    /// contact. Fails fast with `SessionBusy` if another request holds it.
    pub fn acquire(&self, session_id: &str) -> Result<OwnedMutexGuard<ConversationState>, AppError> {
        let slot = {
            let mut sessions = self.sessions.lock().expect("session map poisoned");
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationState::default())))
                .clone()
        };

        slot.try_lock_owned().map_err(|_| AppError::SessionBusy)
    }

    /// Drops a session entirely. An in-flight request keeps its guard
    /// alive, but follow-up acquires start from a fresh state.
    pub fn remove(&self, session_id: &str) {
        self.sessions
            .lock()
            .expect("session map poisoned")
            .remove(session_id);
    }
}
