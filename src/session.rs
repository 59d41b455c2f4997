//! Per-chat conversation sessions.
//!
//! The bot's flows span several messages (ask for a query, show numbered
//! results, wait for a selection). State for that lives here, in an explicit
//! store handed to the bot, and is swept on a schedule so an abandoned
//! conversation doesn't pin its result list forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{SearchHit, SiteKey};

pub const SESSION_TTL_MINUTES: i64 = 10;

/// What the bot is currently waiting for from one chat.
#[derive(Debug, Clone)]
pub enum Conversation {
    AwaitingQuery,
    AwaitingSelection(Vec<SearchHit>),
    AwaitingSiteChoice,
    AwaitingNewUrl(SiteKey),
}

#[derive(Debug, Clone)]
struct Session {
    state: Conversation,
    last_active: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<i64, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, chat_id: i64, state: Conversation) {
        let mut sessions = self.inner.lock().unwrap();
        sessions.insert(
            chat_id,
            Session {
                state,
                last_active: Utc::now(),
            },
        );
    }

    /// Remove and return a chat's pending state; handlers re-set it when the
    /// conversation continues.
    pub fn take(&self, chat_id: i64) -> Option<Conversation> {
        let mut sessions = self.inner.lock().unwrap();
        sessions.remove(&chat_id).map(|session| session.state)
    }

    pub fn clear(&self, chat_id: i64) {
        self.inner.lock().unwrap().remove(&chat_id);
    }

    /// Drop sessions whose last activity predates `cutoff`; returns how many
    /// were dropped.
    pub fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.inner.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_active >= cutoff);
        let swept = before - sessions.len();
        if swept > 0 {
            debug!(swept, "expired sessions swept");
        }
        swept
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_older_than(Utc::now() - Duration::minutes(SESSION_TTL_MINUTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_removes_pending_state() {
        let store = SessionStore::new();
        store.set(1, Conversation::AwaitingQuery);

        assert!(matches!(store.take(1), Some(Conversation::AwaitingQuery)));
        assert!(store.take(1).is_none());
    }

    #[test]
    fn sessions_are_isolated_per_chat() {
        let store = SessionStore::new();
        store.set(1, Conversation::AwaitingQuery);
        store.set(2, Conversation::AwaitingSiteChoice);

        assert!(matches!(store.take(2), Some(Conversation::AwaitingSiteChoice)));
        assert!(matches!(store.take(1), Some(Conversation::AwaitingQuery)));
    }

    #[test]
    fn sweep_drops_only_stale_sessions() {
        let store = SessionStore::new();
        store.set(1, Conversation::AwaitingQuery);

        // Nothing is older than the TTL yet.
        assert_eq!(store.sweep_expired(), 0);
        assert!(matches!(store.take(1), Some(Conversation::AwaitingQuery)));

        store.set(2, Conversation::AwaitingSiteChoice);
        let future_cutoff = Utc::now() + Duration::seconds(1);
        assert_eq!(store.sweep_older_than(future_cutoff), 1);
        assert!(store.take(2).is_none());
    }
}
