//! Session manager (C10): owns the live-session table and the
//! process-wide counters (live count, optional exit timer, per-session
//! idle tracking).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::session::Session;

/// Raised when a session's socket has been idle (no inbound message)
/// longer than the configured wait time; the caller sends a PING first
/// and only disconnects if a second window elapses with no reply.
pub struct IdleSessions {
    pub ping_due: Vec<u32>,
    pub disconnect_due: Vec<u32>,
}

pub struct SessionManager {
    sessions: Mutex<HashMap<u32, Arc<Session>>>,
    next_id: AtomicU32,
    /// `Some(deadline)` once the last session has closed and an exit
    /// timer was requested; the process shuts down if no new session
    /// arrives before the deadline.
    exit_deadline: Mutex<Option<Instant>>,
    exit_grace: Duration,
}

impl SessionManager {
    pub fn new(exit_grace: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            exit_deadline: Mutex::new(None),
            exit_grace,
        }
    }

    pub fn register(&self, read_only: bool) -> Arc<Session> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(Session::new(id, read_only));
        self.sessions.lock().expect("sessions lock poisoned").insert(id, session.clone());
        *self.exit_deadline.lock().expect("exit deadline lock poisoned") = None;
        tracing::info!(session = id, live = self.live_count(), "session registered");
        session
    }

    /// Removes a session once its task refcount has reached zero.
    /// Called by the task runtime, not directly by the socket loop.
    pub fn retire(&self, session_id: u32) {
        self.sessions.lock().expect("sessions lock poisoned").remove(&session_id);
        let live = self.live_count();
        tracing::info!(session = session_id, live, "session retired");
        if live == 0 && self.exit_grace > Duration::ZERO {
            *self.exit_deadline.lock().expect("exit deadline lock poisoned") = Some(Instant::now() + self.exit_grace);
        }
    }

    pub fn get(&self, session_id: u32) -> Option<Arc<Session>> {
        self.sessions.lock().expect("sessions lock poisoned").get(&session_id).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.sessions.lock().expect("sessions lock poisoned").len()
    }

    /// Whether the process-wide exit timer has elapsed with no new
    /// session having registered in the meantime.
    pub fn should_exit(&self, now: Instant) -> bool {
        self.exit_deadline
            .lock()
            .expect("exit deadline lock poisoned")
            .is_some_and(|deadline| now >= deadline)
    }

    /// Scans every live session's last-message timestamp against
    /// `idle_wait`, splitting results into sessions due a PING and
    /// sessions that already had one and are now due disconnection.
    /// `already_pinged` names sessions for which the caller has already
    /// sent a PING during the current idle window.
    pub fn scan_idle(&self, now: Instant, idle_wait: Duration, already_pinged: &[u32]) -> IdleSessions {
        let sessions = self.sessions.lock().expect("sessions lock poisoned");
        let mut ping_due = Vec::new();
        let mut disconnect_due = Vec::new();
        for (&id, session) in sessions.iter() {
            if session.idle_for(now) >= idle_wait {
                if already_pinged.contains(&id) {
                    disconnect_due.push(id);
                } else {
                    ping_due.push(id);
                }
            }
        }
        IdleSessions { ping_due, disconnect_due }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_clears_any_pending_exit_timer() {
        let manager = SessionManager::new(Duration::from_secs(1));
        let session = manager.register(false);
        manager.retire(session.session_id);
        assert!(manager.should_exit(Instant::now() + Duration::from_secs(2)));
        manager.register(false);
        assert!(!manager.should_exit(Instant::now() + Duration::from_secs(2)));
    }

    #[test]
    fn live_count_tracks_register_and_retire() {
        let manager = SessionManager::new(Duration::ZERO);
        let a = manager.register(false);
        let _b = manager.register(false);
        assert_eq!(manager.live_count(), 2);
        manager.retire(a.session_id);
        assert_eq!(manager.live_count(), 1);
    }

    #[test]
    fn unknown_session_lookup_is_none() {
        let manager = SessionManager::new(Duration::ZERO);
        assert!(manager.get(999).is_none());
    }
}
