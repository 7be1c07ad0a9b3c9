//! Result visibility gate.

use polis_common::{AppError, AppResult, SharedClock};
use polis_db::{
    entities::poll::{self, VisibilityMode},
    repositories::{PollRepository, PollResponseRepository},
};

use super::{
    aggregation::{AggregationEngine, PollResult},
    window::WindowPhase,
};

/// Outcome of a visibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultAccess {
    Visible,
    Hidden,
}

impl ResultAccess {
    /// Decide whether results may be shown.
    ///
    /// `has_participated` counts withdrawn responses too.
    #[must_use]
    pub const fn decide(mode: VisibilityMode, phase: WindowPhase, has_participated: bool) -> Self {
        let visible = match (mode, phase) {
            (_, WindowPhase::NotYetOpen) => false,
            (VisibilityMode::AlwaysVisible, _) | (_, WindowPhase::Closed) => true,
            (VisibilityMode::HiddenUntilClose, WindowPhase::Open) => false,
            (VisibilityMode::VisibleAfterVote, WindowPhase::Open) => has_participated,
        };
        if visible { Self::Visible } else { Self::Hidden }
    }

    #[must_use]
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Serves results only to viewers allowed to see them.
#[derive(Clone)]
pub struct VisibilityGate {
    poll_repo: PollRepository,
    response_repo: PollResponseRepository,
    engine: AggregationEngine,
    clock: SharedClock,
}

impl VisibilityGate {
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        response_repo: PollResponseRepository,
        engine: AggregationEngine,
        clock: SharedClock,
    ) -> Self {
        Self {
            poll_repo,
            response_repo,
            engine,
            clock,
        }
    }

    /// Check whether `viewer_id` may see the results of `poll_id`.
    ///
    /// Fails with `State("results hidden")` when gated. Anonymous viewers
    /// have never participated.
    pub async fn can_view(&self, poll_id: &str, viewer_id: Option<&str>) -> AppResult<()> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.check(&poll, viewer_id).await
    }

    /// Results of `poll_id` as seen by `viewer_id`.
    pub async fn results(&self, poll_id: &str, viewer_id: Option<&str>) -> AppResult<PollResult> {
        self.can_view(poll_id, viewer_id).await?;
        self.engine.compute(poll_id).await
    }

    async fn check(&self, poll: &poll::Model, viewer_id: Option<&str>) -> AppResult<()> {
        let phase = WindowPhase::of(poll, self.clock.now());

        let has_participated = match (poll.visibility_mode, phase, viewer_id) {
            (VisibilityMode::VisibleAfterVote, WindowPhase::Open, Some(viewer_id)) => {
                self.response_repo
                    .has_participated(&poll.id, viewer_id)
                    .await?
            }
            _ => false,
        };

        match ResultAccess::decide(poll.visibility_mode, phase, has_participated) {
            ResultAccess::Visible => Ok(()),
            ResultAccess::Hidden => {
                tracing::debug!(
                    poll_id = %poll.id,
                    mode = ?poll.visibility_mode,
                    phase = ?phase,
                    "Results hidden from viewer"
                );
                Err(AppError::State("results hidden".to_string()))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::window::WindowPhase::{Closed, NotYetOpen, Open};
    use polis_db::entities::poll::VisibilityMode::{
        AlwaysVisible, HiddenUntilClose, VisibleAfterVote,
    };

    #[test]
    fn test_nothing_is_visible_before_open() {
        for mode in [AlwaysVisible, HiddenUntilClose, VisibleAfterVote] {
            assert_eq!(ResultAccess::decide(mode, NotYetOpen, true), ResultAccess::Hidden);
        }
    }

    #[test]
    fn test_everything_is_visible_after_close() {
        for mode in [AlwaysVisible, HiddenUntilClose, VisibleAfterVote] {
            assert!(ResultAccess::decide(mode, Closed, false).is_visible());
        }
    }

    #[test]
    fn test_open_window() {
        assert!(ResultAccess::decide(AlwaysVisible, Open, false).is_visible());
        assert!(!ResultAccess::decide(HiddenUntilClose, Open, true).is_visible());
        assert!(!ResultAccess::decide(VisibleAfterVote, Open, false).is_visible());
        assert!(ResultAccess::decide(VisibleAfterVote, Open, true).is_visible());
    }
}
