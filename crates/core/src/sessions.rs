//! Session storage keyed by chat/session id.
//!
//! Every update to a session runs inside that session's own mutex, so events
//! for one session are applied one at a time while different sessions never
//! contend beyond a dashmap shard lookup.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::session::{Session, SessionId};

pub trait SessionStore: Send + Sync {
    /// Runs `update` against an existing session. Returns `None` without
    /// creating anything when the session is absent.
    fn with_existing<R, F>(&self, id: &SessionId, update: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R;

    /// Runs `update` against the session, inserting `init()` first when it is
    /// absent. The flag passed to `update` is `true` for a fresh insert.
    fn with_or_insert<R, I, F>(&self, id: &SessionId, init: I, update: F) -> R
    where
        I: FnOnce() -> Session,
        F: FnOnce(&mut Session, bool) -> R;

    fn get(&self, id: &SessionId) -> Option<Session>;
    fn remove(&self, id: &SessionId) -> Option<Session>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        // Clone the handle so the shard guard is released before locking.
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn with_existing<R, F>(&self, id: &SessionId, update: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let handle = self.handle(id)?;
        let mut session = handle.lock();
        Some(update(&mut *session))
    }

    fn with_or_insert<R, I, F>(&self, id: &SessionId, init: I, update: F) -> R
    where
        I: FnOnce() -> Session,
        F: FnOnce(&mut Session, bool) -> R,
    {
        let mut created = false;
        let handle = {
            let entry = self.sessions.entry(id.clone()).or_insert_with(|| {
                created = true;
                Arc::new(Mutex::new(init()))
            });
            Arc::clone(entry.value())
        };

        let mut session = handle.lock();
        update(&mut *session, created)
    }

    fn get(&self, id: &SessionId) -> Option<Session> {
        self.handle(id).map(|handle| handle.lock().clone())
    }

    fn remove(&self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id).map(|(_, handle)| handle.lock().clone())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::{InMemorySessionStore, SessionStore};
    use crate::domain::session::{Session, SessionId};
    use crate::flows::states::ConversationState;

    fn fresh(id: &SessionId) -> Session {
        Session::new(id.clone(), ConversationState::AwaitingLocale)
    }

    #[test]
    fn existing_lookup_does_not_create_sessions() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from(5);

        assert_eq!(store.with_existing(&id, |session| session.state), None);
        assert!(store.is_empty());
    }

    #[test]
    fn insert_reports_creation_once() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from(5);

        let first = store.with_or_insert(&id, || fresh(&id), |_, created| created);
        let second = store.with_or_insert(&id, || fresh(&id), |_, created| created);

        assert!(first);
        assert!(!second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).map(|session| session.state), Some(ConversationState::AwaitingLocale));
    }

    #[test]
    fn remove_returns_last_snapshot() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from(9);
        store.with_or_insert(&id, || fresh(&id), |session, _| {
            session.state = ConversationState::AwaitingUsage;
        });

        let removed = store.remove(&id).expect("session present");
        assert_eq!(removed.state, ConversationState::AwaitingUsage);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn updates_to_one_session_are_serialized() {
        let store = Arc::new(InMemorySessionStore::new());
        let id = SessionId::from(77);
        store.with_or_insert(&id, || fresh(&id), |_, _| ());

        thread::scope(|scope| {
            for _ in 0..8 {
                let store = Arc::clone(&store);
                let id = id.clone();
                scope.spawn(move || {
                    for _ in 0..250 {
                        store.with_existing(&id, |session| {
                            let label = session.class_label.take().unwrap_or_default();
                            let count = label.parse::<u32>().unwrap_or(0) + 1;
                            session.class_label = Some(count.to_string());
                        });
                    }
                });
            }
        });

        let session = store.get(&id).expect("session present");
        assert_eq!(session.class_label.as_deref(), Some("2000"));
    }

    #[test]
    fn independent_sessions_do_not_share_state() {
        let store = Arc::new(InMemorySessionStore::new());

        thread::scope(|scope| {
            for chat in 0..16_i64 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    let id = SessionId::from(chat);
                    store.with_or_insert(&id, || fresh(&id), |session, _| {
                        session.class_label = Some(format!("chat-{chat}"));
                    });
                });
            }
        });

        assert_eq!(store.len(), 16);
        for chat in 0..16_i64 {
            let session = store.get(&SessionId::from(chat)).expect("session present");
            assert_eq!(session.class_label, Some(format!("chat-{chat}")));
        }
    }
}
