//! Storage and expiry of per-user interactive sessions.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use mockall::automock;

use crate::interaction::UserSession;

/// How long a session survives without a message from its user.
pub const SESSION_TIMEOUT_SECS: u64 = 300;

/// Source of the current time, injectable so expiry is testable.
#[automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by the system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Result of looking up a user's session.
pub enum SessionLookup {
    /// A live session, cloned out for handling
    Active(UserSession),
    /// A session exists but its user went quiet for too long
    Expired,
    /// No session at all
    Absent,
}

/// In-memory session store, keyed by chat user id.
///
/// Expiry is lazy: nothing ticks in the background, a session is found to be
/// expired at the moment its user's next message arrives.
pub struct SessionStore {
    sessions: HashMap<String, UserSession>,
    clock: Box<dyn Clock>,
}

impl SessionStore {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        SessionStore {
            sessions: HashMap::new(),
            clock,
        }
    }

    /// Whether the user has a session, live or expired.
    ///
    /// An expired session still counts: its user's next message must be
    /// answered with the timeout notice instead of being parsed as a command.
    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    /// Looks up the user's session and checks its age.
    pub fn lookup(&self, user_id: &str) -> SessionLookup {
        match self.sessions.get(user_id) {
            None => SessionLookup::Absent,
            Some(session) => {
                let age = self.clock.now().duration_since(session.last_activity);
                if age >= Duration::from_secs(SESSION_TIMEOUT_SECS) {
                    SessionLookup::Expired
                } else {
                    SessionLookup::Active(session.clone())
                }
            }
        }
    }

    /// Stores a session and stamps it as active now.
    pub fn put(&mut self, mut session: UserSession) {
        session.last_activity = self.clock.now();
        debug!(
            "session for {} now in state {:?}",
            &session.user_id, &session.context
        );
        self.sessions.insert(session.user_id.clone(), session);
    }

    /// Drops the user's session, if any.
    pub fn remove(&mut self, user_id: &str) {
        if self.sessions.remove(user_id).is_some() {
            debug!("session for {} dropped", user_id);
        }
    }
}
