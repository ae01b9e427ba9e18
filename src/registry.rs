//! Ownership of live games, indexed by id and by tracking message.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use tracing::{debug, info, instrument};

use crate::game::{GameId, GameSession};
use crate::messaging::MessageId;

/// A session shared between the registry and in-flight handlers. The mutex is
/// only held for synchronous sections, never across an `.await`.
pub type SharedSession = Arc<Mutex<GameSession>>;

/// Locks a session, recovering the data if a previous holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, GameSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sole creator and unlinker of game sessions.
#[derive(Default)]
pub struct GameRegistry {
    sessions: HashMap<GameId, SharedSession>,
    by_message: HashMap<MessageId, GameId>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh id, lets `build` construct the session for it, and stores
    /// the result.
    #[instrument(skip(self, build))]
    pub fn create_with(&mut self, build: impl FnOnce(GameId) -> GameSession) -> SharedSession {
        let id = self.mint_id();
        let session = Arc::new(Mutex::new(build(id.clone())));
        info!(game_id = %id, "session created");
        self.sessions.insert(id, Arc::clone(&session));
        session
    }

    pub fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.get(id).cloned()
    }

    /// Associates the message that displays game `id`.
    pub fn link_message(&mut self, id: &str, message_id: MessageId) {
        debug!(game_id = id, message_id = %message_id, "tracking message linked");
        self.by_message.insert(message_id, id.to_string());
    }

    pub fn by_message(&self, message_id: &str) -> Option<SharedSession> {
        self.by_message
            .get(message_id)
            .and_then(|id| self.sessions.get(id))
            .cloned()
    }

    /// Drops game `id` and every message pointing at it. Handlers that still
    /// hold the `Arc` keep a usable session.
    #[instrument(skip(self))]
    pub fn unlink(&mut self, id: &str) -> Option<SharedSession> {
        self.by_message.retain(|_, game_id| game_id != id);
        let removed = self.sessions.remove(id);
        if removed.is_some() {
            info!(game_id = id, "session unlinked");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn mint_id(&self) -> GameId {
        let mut rng = rand::rng();
        loop {
            let id = format!("rv-{:08x}", rng.random::<u32>());
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }
}
