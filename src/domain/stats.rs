use crate::domain::models::GameSession;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub completion_rate: f64,
    pub avg_completion_time_s: Option<f64>,
    pub avg_attempts: f64,
    pub retry_rate: f64,
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole` rounded to four places, `0` for an empty whole.
pub fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64, 4)
    }
}

pub fn summarize_sessions(sessions: &[GameSession]) -> SessionSummary {
    let total_sessions = sessions.len();
    let durations: Vec<f64> = sessions.iter().filter_map(GameSession::duration_secs).collect();
    let completed_sessions = durations.len();

    let avg_completion_time_s = if durations.is_empty() {
        None
    } else {
        Some(round_to(durations.iter().sum::<f64>() / durations.len() as f64, 2))
    };

    let attempts: i64 = sessions.iter().map(|s| s.attempts_count as i64).sum();
    let avg_attempts = if total_sessions == 0 {
        0.0
    } else {
        round_to(attempts as f64 / total_sessions as f64, 2)
    };

    let retried = sessions.iter().filter(|s| s.attempts_count > 0).count();

    SessionSummary {
        total_sessions,
        completed_sessions,
        completion_rate: rate(completed_sessions, total_sessions),
        avg_completion_time_s,
        avg_attempts,
        retry_rate: rate(retried, total_sessions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn session(completed_after_secs: Option<i64>, attempts: i32) -> GameSession {
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
        let mut s = GameSession::new(1, Some(1), start);
        s.attempts_count = attempts;
        if let Some(secs) = completed_after_secs {
            s.is_completed = true;
            s.end_time = Some(start + Duration::seconds(secs));
        }
        s
    }

    #[test]
    fn empty_history() {
        let summary = summarize_sessions(&[]);
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.completion_rate, 0.0);
        assert_eq!(summary.avg_completion_time_s, None);
        assert_eq!(summary.avg_attempts, 0.0);
    }

    #[test]
    fn mixed_history() {
        let sessions = vec![
            session(Some(60), 0),
            session(Some(120), 2),
            session(None, 1),
        ];
        let summary = summarize_sessions(&sessions);
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.completed_sessions, 2);
        assert_eq!(summary.completion_rate, 0.6667);
        assert_eq!(summary.avg_completion_time_s, Some(90.0));
        assert_eq!(summary.avg_attempts, 1.0);
        assert_eq!(summary.retry_rate, 0.6667);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(rate(1, 3), 0.3333);
        assert_eq!(rate(4, 0), 0.0);
    }
}
