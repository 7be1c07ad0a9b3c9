//! Voting window evaluation.
//!
//! Open/closed is always derived from `(start_at, end_at, now)` at call time
//! and never stored.

use chrono::{DateTime, Utc};
use polis_db::entities::poll;
use serde::Serialize;

/// Where `now` falls relative to a poll's voting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPhase {
    NotYetOpen,
    Open,
    Closed,
}

impl WindowPhase {
    /// Evaluate the half-open window `[start_at, end_at)`.
    #[must_use]
    pub fn evaluate(start_at: DateTime<Utc>, end_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start_at {
            Self::NotYetOpen
        } else if now < end_at {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// Phase of a stored poll. Archived polls are closed.
    #[must_use]
    pub fn of(poll: &poll::Model, now: DateTime<Utc>) -> Self {
        if poll.archived_at.is_some() {
            return Self::Closed;
        }
        Self::evaluate(
            poll.start_at.with_timezone(&Utc),
            poll.end_at.with_timezone(&Utc),
            now,
        )
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        (start, start + Duration::hours(2))
    }

    #[test]
    fn test_before_start_is_not_yet_open() {
        let (start, end) = window();
        let phase = WindowPhase::evaluate(start, end, start - Duration::milliseconds(1));
        assert_eq!(phase, WindowPhase::NotYetOpen);
    }

    #[test]
    fn test_start_is_inclusive() {
        let (start, end) = window();
        assert_eq!(WindowPhase::evaluate(start, end, start), WindowPhase::Open);
    }

    #[test]
    fn test_end_is_exclusive() {
        let (start, end) = window();
        assert_eq!(
            WindowPhase::evaluate(start, end, end - Duration::milliseconds(1)),
            WindowPhase::Open
        );
        assert_eq!(WindowPhase::evaluate(start, end, end), WindowPhase::Closed);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&WindowPhase::NotYetOpen).unwrap(),
            "\"not_yet_open\""
        );
    }
}
