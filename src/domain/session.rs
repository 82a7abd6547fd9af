//! Game session lifecycle.
//!
//! A session is `Active` until the player answers the gas holder's question
//! correctly (`Completed`, terminal). An uncompleted session older than
//! [`SESSION_TIMEOUT_MINUTES`] reads as `Expired`; that state is derived from
//! `start_time` and never written back.

use crate::domain::models::{GameSession, PlayerInteraction};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const SESSION_TIMEOUT_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Active,
    Expired,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Completed,
    Retry,
}

pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn timeout() -> Duration {
    Duration::minutes(SESSION_TIMEOUT_MINUTES)
}

impl GameSession {
    pub fn new(gas_holder_npc_id: i32, user_id: Option<i64>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: new_session_id(),
            user_id,
            gas_holder_npc_id,
            start_time: now,
            end_time: None,
            is_completed: false,
            attempts_count: 0,
        }
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.is_completed {
            SessionState::Completed
        } else if now - self.start_time > timeout() {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == SessionState::Expired
    }

    /// `Err` with the blocking state when the session takes no more moves.
    /// A completed session reports `Completed` even once it is old enough to
    /// have expired.
    pub fn ensure_playable(&self, now: DateTime<Utc>) -> Result<(), SessionState> {
        match self.state_at(now) {
            SessionState::Active => Ok(()),
            blocked => Err(blocked),
        }
    }

    pub fn is_gas_holder(&self, npc_id: i32) -> bool {
        self.gas_holder_npc_id == npc_id
    }

    /// Applies a graded answer. Caller must have checked the session is active.
    pub fn record_answer(&mut self, is_correct: bool, now: DateTime<Utc>) -> AnswerOutcome {
        if is_correct {
            self.is_completed = true;
            self.end_time = Some(now);
            AnswerOutcome::Completed
        } else {
            self.attempts_count += 1;
            AnswerOutcome::Retry
        }
    }

    /// Seconds between start and end, only for completed sessions.
    pub fn duration_secs(&self) -> Option<f64> {
        if !self.is_completed {
            return None;
        }
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0)
    }
}

/// Most recent interaction that handed out `question_id`.
pub fn latest_interaction_for(
    interactions: &[PlayerInteraction],
    question_id: i32,
) -> Option<&PlayerInteraction> {
    interactions
        .iter()
        .filter(|i| i.question_id == Some(question_id))
        .max_by_key(|i| (i.timestamp, i.interaction_id))
}

pub fn normalize_answer(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn answers_match(given: &str, expected: &str) -> bool {
    normalize_answer(given) == normalize_answer(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, minute, 0).unwrap()
    }

    #[test]
    fn fresh_session_is_active() {
        let session = GameSession::new(3, Some(7), at(0));
        assert_eq!(session.state_at(at(10)), SessionState::Active);
        assert_eq!(session.session_id.len(), 32);
        assert!(session.is_gas_holder(3));
        assert!(!session.is_gas_holder(4));
    }

    #[test]
    fn expiry_is_strictly_after_timeout() {
        let session = GameSession::new(1, None, at(0));
        assert_eq!(session.state_at(at(30)), SessionState::Active);
        assert_eq!(session.state_at(at(31)), SessionState::Expired);
        assert!(session.is_expired_at(at(45)));
    }

    #[test]
    fn completed_session_never_expires() {
        let mut session = GameSession::new(1, None, at(0));
        session.record_answer(true, at(5));
        assert_eq!(session.state_at(at(59)), SessionState::Completed);
        assert!(!session.is_expired_at(at(59)));
    }

    #[test]
    fn correct_answer_completes_and_stamps_end_time() {
        let mut session = GameSession::new(1, None, at(0));
        let outcome = session.record_answer(true, at(4));
        assert_eq!(outcome, AnswerOutcome::Completed);
        assert!(session.is_completed);
        assert_eq!(session.end_time, Some(at(4)));
        assert_eq!(session.attempts_count, 0);
        assert_eq!(session.duration_secs(), Some(240.0));
    }

    #[test]
    fn wrong_answer_counts_attempt_and_keeps_session_open() {
        let mut session = GameSession::new(1, None, at(0));
        assert_eq!(session.record_answer(false, at(1)), AnswerOutcome::Retry);
        assert_eq!(session.record_answer(false, at(2)), AnswerOutcome::Retry);
        assert_eq!(session.attempts_count, 2);
        assert!(!session.is_completed);
        assert!(session.end_time.is_none());
        assert!(session.duration_secs().is_none());
    }

    #[test]
    fn completion_is_reported_before_expiry() {
        let mut session = GameSession::new(1, None, at(0));
        assert_eq!(session.ensure_playable(at(10)), Ok(()));
        assert_eq!(session.ensure_playable(at(40)), Err(SessionState::Expired));

        session.record_answer(true, at(5));
        assert_eq!(session.ensure_playable(at(10)), Err(SessionState::Completed));
        assert_eq!(session.ensure_playable(at(40)), Err(SessionState::Completed));
    }

    fn interaction(id: i64, question_id: Option<i32>, minute: u32) -> PlayerInteraction {
        PlayerInteraction {
            interaction_id: id,
            session_id: "s".into(),
            npc_id: 2,
            question_id,
            user_answer: None,
            is_correct: None,
            timestamp: at(minute),
            response_time_ms: None,
        }
    }

    #[test]
    fn latest_interaction_picks_newest_for_question() {
        let rows = vec![
            interaction(1, Some(4), 1),
            interaction(2, None, 2),
            interaction(3, Some(4), 3),
            interaction(4, Some(9), 4),
            interaction(5, Some(4), 3),
        ];
        assert_eq!(latest_interaction_for(&rows, 4).map(|i| i.interaction_id), Some(5));
        assert_eq!(latest_interaction_for(&rows, 9).map(|i| i.interaction_id), Some(4));
        assert!(latest_interaction_for(&rows, 7).is_none());
        assert!(latest_interaction_for(&[], 4).is_none());
    }

    #[test]
    fn answers_compare_trimmed_and_case_folded() {
        assert!(answers_match("  Paris ", "paris"));
        assert!(answers_match("B", "b"));
        assert!(!answers_match("Lyon", "Paris"));
        assert!(answers_match("", "   "));
    }
}
