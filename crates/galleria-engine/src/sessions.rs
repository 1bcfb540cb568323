use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use galleria_contracts::chat::ConversationState;

/// Shared handle to one session's history. Holding the lock serializes turns
/// for that session.
pub type SessionHandle = Arc<Mutex<ConversationState>>;

/// Process-scoped session storage.
pub trait SessionStore: Send + Sync {
    fn create(&self, state: ConversationState) -> String;
    fn get(&self, id: &str) -> Option<SessionHandle>;
    fn delete(&self, id: &str) -> bool;
}

/// Locks a session, recovering the state if a previous holder panicked.
/// History only changes after a turn fully succeeds, so the inner state is
/// always consistent.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, ConversationState> {
    handle.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, state: ConversationState) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.map().insert(id.clone(), Arc::new(Mutex::new(state)));
        id
    }

    fn get(&self, id: &str) -> Option<SessionHandle> {
        self.map().get(id).cloned()
    }

    fn delete(&self, id: &str) -> bool {
        self.map().remove(id).is_some()
    }
}
