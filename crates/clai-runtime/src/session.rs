use std::collections::HashMap;
use std::sync::Mutex;

use clai_types::Session;

/// A `command_start` awaiting its `command_end`.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub command_id: String,
    pub cwd: String,
    pub cmd_raw: String,
    pub ts_ms: i64,
    pub repo_key: Option<String>,
    pub branch: Option<String>,
    pub ephemeral: bool,
}

/// Per-session state the daemon keeps in memory: pending starts, the last
/// finalized template (transition anchor), and the ephemeral-only flags.
#[derive(Debug, Default)]
pub struct SessionState {
    pub session: Option<Session>,
    pub incognito: bool,
    pub last_template_id: Option<String>,
    pub last_event_ms: i64,
    pending: HashMap<String, PendingCommand>,
    /// Transition counts fed only by ephemeral events; never persisted.
    ephemeral_transitions: HashMap<(String, String), u32>,
}

impl SessionState {
    pub fn push_pending(&mut self, pending: PendingCommand) {
        // A hook may retry command_start; last write wins.
        self.pending.insert(pending.command_id.clone(), pending);
    }

    pub fn take_pending(&mut self, command_id: &str) -> Option<PendingCommand> {
        self.pending.remove(command_id)
    }

    pub fn record_ephemeral_transition(&mut self, prev: &str, next: &str) {
        *self
            .ephemeral_transitions
            .entry((prev.to_string(), next.to_string()))
            .or_insert(0) += 1;
    }

    pub fn ephemeral_transition_count(&self, prev: &str, next: &str) -> u32 {
        self.ephemeral_transitions
            .get(&(prev.to_string(), next.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// Shared registry of live sessions, guarded per call. Entries appear on
/// `session_start` (or lazily on the first event naming an unknown session)
/// and are dropped on `session_end`.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, session: Session, incognito: bool) {
        let mut sessions = self.sessions.lock().unwrap();
        let state = sessions.entry(session.id.clone()).or_default();
        state.incognito = incognito;
        state.last_event_ms = session.started_ms;
        state.session = Some(session);
    }

    /// Remove the in-memory state for an ended session. Returns whether the
    /// session was known.
    pub fn end(&self, session_id: &str) -> bool {
        self.sessions.lock().unwrap().remove(session_id).is_some()
    }

    pub fn is_known(&self, session_id: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(session_id)
    }

    pub fn is_incognito(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.incognito)
            .unwrap_or(false)
    }

    pub fn last_template_id(&self, session_id: &str) -> Option<String> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .and_then(|s| s.last_template_id.clone())
    }

    pub fn project_types(&self, session_id: &str) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .and_then(|s| s.session.as_ref())
            .map(|s| s.project_types.clone())
            .unwrap_or_default()
    }

    /// Run a closure against one session's state, creating it on first
    /// sight so events can arrive before their session_start.
    pub fn with_state<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut sessions = self.sessions.lock().unwrap();
        let state = sessions.entry(session_id.to_string()).or_default();
        f(state)
    }

    pub fn live_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            shell: None,
            host: None,
            user: None,
            started_ms: 1_000,
            ended_ms: None,
            project_types: Vec::new(),
        }
    }

    #[test]
    fn start_and_end_lifecycle() {
        let registry = SessionRegistry::new();
        registry.start(session("s1"), false);
        assert!(registry.is_known("s1"));
        assert!(registry.end("s1"));
        assert!(!registry.is_known("s1"));
        assert!(!registry.end("s1"));
    }

    #[test]
    fn pending_commands_are_taken_once() {
        let registry = SessionRegistry::new();
        registry.with_state("s1", |state| {
            state.push_pending(PendingCommand {
                command_id: "c1".to_string(),
                cwd: "/tmp".to_string(),
                cmd_raw: "ls".to_string(),
                ts_ms: 5,
                repo_key: None,
                branch: None,
                ephemeral: false,
            });
        });

        let first = registry.with_state("s1", |state| state.take_pending("c1"));
        assert!(first.is_some());
        let second = registry.with_state("s1", |state| state.take_pending("c1"));
        assert!(second.is_none());
    }

    #[test]
    fn incognito_flag_sticks() {
        let registry = SessionRegistry::new();
        registry.start(session("s1"), true);
        assert!(registry.is_incognito("s1"));
        assert!(!registry.is_incognito("other"));
    }

    #[test]
    fn ephemeral_transitions_stay_in_memory() {
        let registry = SessionRegistry::new();
        registry.with_state("s1", |state| {
            state.record_ephemeral_transition("a", "b");
            state.record_ephemeral_transition("a", "b");
        });
        let count =
            registry.with_state("s1", |state| state.ephemeral_transition_count("a", "b"));
        assert_eq!(count, 2);
    }
}
