//! Per-conversation registration state
//!
//! The registration workflow is a short sequential conversation, so its
//! state lives outside the permanent store: an in-process map keyed by chat
//! id. Entries are created when `/register` passes the entry guard and
//! removed on every terminal transition (request submitted, or abort). A
//! half-finished conversation has no timeout of its own; it simply waits
//! for the next message.

use dashmap::DashMap;

/// Where the conversation currently stands. The first accepted password is
/// carried inside the state so a cleared session leaves nothing behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    AwaitingPassword,
    AwaitingPasswordConfirm { password: String },
    AwaitingCity { password: String },
}

/// Interim data for one registration conversation.
#[derive(Debug, Clone)]
pub struct Session {
    /// Display name derived at entry (Telegram username or `user_<id>`)
    pub username: String,
    pub state: RegistrationState,
}

/// Session storage for all in-flight registration conversations.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: DashMap<i64, Session>,
}

impl SessionStore {
    /// Open a new conversation in `AwaitingPassword`. Replaces any stale
    /// session for the same chat (a repeated `/register` restarts the flow).
    pub fn begin(&self, chat_id: i64, username: String) {
        self.inner.insert(
            chat_id,
            Session {
                username,
                state: RegistrationState::AwaitingPassword,
            },
        );
    }

    pub fn get(&self, chat_id: i64) -> Option<Session> {
        self.inner.get(&chat_id).map(|entry| entry.value().clone())
    }

    pub fn is_active(&self, chat_id: i64) -> bool {
        self.inner.contains_key(&chat_id)
    }

    /// Move an existing conversation to a new state. No-op if the session
    /// was cleared in the meantime.
    pub fn set_state(&self, chat_id: i64, state: RegistrationState) {
        if let Some(mut entry) = self.inner.get_mut(&chat_id) {
            entry.state = state;
        }
    }

    /// Terminal transition: drop the session and everything it held.
    pub fn clear(&self, chat_id: i64) {
        self.inner.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_begin_starts_awaiting_password() {
        let store = SessionStore::default();
        store.begin(1, "alice".to_string());

        let session = store.get(1).unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(session.state, RegistrationState::AwaitingPassword);
        assert!(store.is_active(1));
        assert!(!store.is_active(2));
    }

    #[test]
    fn test_walk_through_the_states() {
        let store = SessionStore::default();
        store.begin(1, "alice".to_string());

        store.set_state(
            1,
            RegistrationState::AwaitingPasswordConfirm {
                password: "secret1".to_string(),
            },
        );
        // mismatch sends the conversation back
        store.set_state(1, RegistrationState::AwaitingPassword);
        store.set_state(
            1,
            RegistrationState::AwaitingPasswordConfirm {
                password: "secret1".to_string(),
            },
        );
        store.set_state(
            1,
            RegistrationState::AwaitingCity {
                password: "secret1".to_string(),
            },
        );

        match store.get(1).unwrap().state {
            RegistrationState::AwaitingCity { password } => assert_eq!(password, "secret1"),
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_clear_is_terminal() {
        let store = SessionStore::default();
        store.begin(1, "alice".to_string());
        store.clear(1);
        assert!(store.get(1).is_none());

        // clearing twice is harmless
        store.clear(1);
    }

    #[test]
    fn test_restart_replaces_session() {
        let store = SessionStore::default();
        store.begin(1, "alice".to_string());
        store.set_state(
            1,
            RegistrationState::AwaitingCity {
                password: "secret1".to_string(),
            },
        );

        store.begin(1, "alice".to_string());
        assert_eq!(store.get(1).unwrap().state, RegistrationState::AwaitingPassword);
    }
}
