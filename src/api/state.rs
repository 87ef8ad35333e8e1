use crate::reconcile::outcome::Outcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type SharedSessionState = Arc<RwLock<SessionSnapshot>>;

/// Which endpoint the session is currently polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    Polling,
    Verifying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Active,
    Resolved,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub booking_id: Option<u64>,
    pub attempts: u32,
    pub mode: PollMode,
    pub phase: SessionPhase,
    pub outcome: Option<Outcome>,
    pub updated_at: DateTime<Utc>,
}

pub fn new_shared_session_state() -> SharedSessionState {
    Arc::new(RwLock::new(SessionSnapshot::default()))
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        SessionSnapshot {
            session_id: None,
            booking_id: None,
            attempts: 0,
            mode: PollMode::Polling,
            phase: SessionPhase::Idle,
            outcome: None,
            updated_at: Utc::now(),
        }
    }
}

impl SessionSnapshot {
    pub fn begin(&mut self, session_id: Uuid, booking_id: u64) {
        *self = SessionSnapshot {
            session_id: Some(session_id),
            booking_id: Some(booking_id),
            phase: SessionPhase::Active,
            ..SessionSnapshot::default()
        };
    }

    pub fn record_attempt(&mut self, attempt: u32, mode: PollMode) {
        // Cycles may finish out of order
        self.attempts = self.attempts.max(attempt);
        self.mode = mode;
        self.touch();
    }

    pub fn resolve(&mut self, outcome: Outcome) {
        self.phase = SessionPhase::Resolved;
        self.outcome = Some(outcome);
        self.touch();
    }

    pub fn cancel(&mut self) {
        self.phase = SessionPhase::Cancelled;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lifecycle() {
        let mut snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.phase, SessionPhase::Idle);

        let id = Uuid::new_v4();
        snapshot.begin(id, 42);
        snapshot.record_attempt(3, PollMode::Polling);
        snapshot.record_attempt(2, PollMode::Polling);
        assert_eq!(snapshot.attempts, 3);

        snapshot.resolve(Outcome::Confirmed);
        assert_eq!(snapshot.phase, SessionPhase::Resolved);
        assert_eq!(snapshot.session_id, Some(id));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "resolved");
        assert_eq!(json["outcome"]["outcome"], "confirmed");
        assert_eq!(json["booking_id"], 42);
    }
}
