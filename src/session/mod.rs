//! Per-browser session state and the store that owns it.

pub mod controller;

pub use controller::Controller;

use crate::conversation::Conversation;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// State for one user's session. Discarded when the session ends.
pub struct Session {
    id: Uuid,
    /// Created on the first chat turn.
    pub conversation: Option<Conversation>,
    /// Even indexes are user turns, odd indexes are replies.
    pub messages: Vec<String>,
    /// Text from the latest upload batch, or restored from the index.
    pub file_content: String,
    pub uploaded_files: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation: None,
            messages: Vec::new(),
            file_content: String::new(),
            uploaded_files: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> impl Iterator<Item = (Speaker, &str)> {
        self.messages.iter().enumerate().map(|(i, m)| {
            let speaker = if i % 2 == 0 { Speaker::User } else { Speaker::Assistant };
            (speaker, m.as_str())
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

struct Slot {
    session: SharedSession,
    last_seen: Instant,
}

/// Live sessions keyed by id. Sessions idle longer than the timeout are
/// dropped the next time the store is touched.
pub struct SessionStore {
    slots: Mutex<HashMap<Uuid, Slot>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { slots: Mutex::new(HashMap::new()), idle_timeout }
    }

    pub fn insert(&self, session: Session) -> SharedSession {
        let id = session.id();
        let shared = Arc::new(tokio::sync::Mutex::new(session));
        let mut slots = self.slots.lock();
        self.prune(&mut slots);
        slots.insert(id, Slot { session: shared.clone(), last_seen: Instant::now() });
        shared
    }

    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        let mut slots = self.slots.lock();
        self.prune(&mut slots);
        slots.get_mut(id).map(|slot| {
            slot.last_seen = Instant::now();
            slot.session.clone()
        })
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self, slots: &mut HashMap<Uuid, Slot>) {
        let before = slots.len();
        slots.retain(|_, slot| slot.last_seen.elapsed() <= self.idle_timeout);
        if slots.len() < before {
            debug!(expired = before - slots.len(), "dropped idle sessions");
        }
    }
}
