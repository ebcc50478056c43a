//! Quest Progress Tracking
//!
//! Progress counters, lifecycle state, and the update result templates hand
//! back to the manager.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a quest instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl QuestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestState::NotStarted => "not_started",
            QuestState::InProgress => "in_progress",
            QuestState::Completed => "completed",
            QuestState::Failed => "failed",
        }
    }
}

/// Completion percentage for a current/target pair, 0 when `target <= 0`
pub fn percent_of(current: f64, target: f64) -> u8 {
    if target <= 0.0 || !target.is_finite() {
        return 0;
    }
    let ratio = (current / target).clamp(0.0, 1.0);
    (ratio * 100.0).round() as u8
}

/// Progress of a single quest instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub current: f64,
    pub target: f64,
    pub state: QuestState,
}

impl Progress {
    pub fn new(target: f64) -> Self {
        Self {
            current: 0.0,
            target,
            state: QuestState::NotStarted,
        }
    }

    pub fn percent(&self) -> u8 {
        percent_of(self.current, self.target)
    }

    /// Overwrite counters and state from an update result
    pub fn apply(&mut self, update: &ProgressUpdate) {
        self.current = update.current;
        self.target = update.target;
        self.state = update.state;
    }

    /// Whether counters or state differ from another reading
    pub fn differs_from(&self, other: &Progress) -> bool {
        self.current != other.current || self.target != other.target || self.state != other.state
    }
}

/// Result of a template's update function.
///
/// Shaped like [`Progress`] plus an explicit `next_state` hint; the manager
/// trusts `state` as returned and completes the instance when either field
/// reads `Completed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub current: f64,
    pub target: f64,
    pub state: QuestState,
    pub next_state: Option<QuestState>,
}

impl ProgressUpdate {
    /// Add `delta`, clamped to `[0, target]`; completes when the target is reached.
    /// A non-finite `delta` adds nothing.
    pub fn advance(progress: &Progress, delta: f64) -> Self {
        let target = progress.target;
        let delta = if delta.is_finite() { delta } else { 0.0 };
        let current = (progress.current + delta).clamp(0.0, target.max(0.0));
        if target > 0.0 && current >= target {
            Self {
                current,
                target,
                state: QuestState::Completed,
                next_state: Some(QuestState::Completed),
            }
        } else {
            Self {
                current,
                target,
                state: QuestState::InProgress,
                next_state: None,
            }
        }
    }

    /// Drop back to zero progress
    pub fn reset(progress: &Progress) -> Self {
        Self {
            current: 0.0,
            target: progress.target,
            state: QuestState::InProgress,
            next_state: None,
        }
    }

    pub fn failed(progress: &Progress) -> Self {
        Self {
            current: progress.current,
            target: progress.target,
            state: QuestState::Failed,
            next_state: Some(QuestState::Failed),
        }
    }

    pub fn percent(&self) -> u8 {
        percent_of(self.current, self.target)
    }

    pub fn completes(&self) -> bool {
        self.state == QuestState::Completed || self.next_state == Some(QuestState::Completed)
    }

    pub fn fails(&self) -> bool {
        self.state == QuestState::Failed || self.next_state == Some(QuestState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_matches_rounding_rule() {
        for target in [1.0f64, 3.0, 7.0, 10.0, 250.0] {
            let mut previous = 0;
            let mut current = 0.0;
            while current <= target {
                let expected = ((current / target).min(1.0) * 100.0).round() as u8;
                let percent = percent_of(current, target);
                assert_eq!(percent, expected);
                assert!(percent >= previous);
                previous = percent;
                current += 1.0;
            }
        }
        assert_eq!(percent_of(15.0, 10.0), 100);
        assert_eq!(percent_of(1.0, 3.0), 33);
        assert_eq!(percent_of(2.0, 3.0), 67);
    }

    #[test]
    fn test_percent_zero_for_non_positive_target() {
        assert_eq!(percent_of(5.0, 0.0), 0);
        assert_eq!(percent_of(5.0, -2.0), 0);
        assert_eq!(Progress::new(0.0).percent(), 0);
    }

    #[test]
    fn test_advance_clamps_and_completes() {
        let mut progress = Progress::new(5.0);
        progress.apply(&ProgressUpdate::advance(&progress, 3.0));
        assert_eq!(progress.current, 3.0);
        assert_eq!(progress.state, QuestState::InProgress);

        let update = ProgressUpdate::advance(&progress, 4.0);
        assert_eq!(update.current, 5.0);
        assert!(update.completes());

        let update = ProgressUpdate::advance(&progress, -10.0);
        assert_eq!(update.current, 0.0);
    }

    #[test]
    fn test_advance_ignores_non_finite_delta() {
        let mut progress = Progress::new(10.0);
        progress.current = 4.0;
        for delta in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let update = ProgressUpdate::advance(&progress, delta);
            assert_eq!(update.current, 4.0);
            assert!(!update.completes());
        }
    }

    #[test]
    fn test_reset_keeps_target() {
        let mut progress = Progress::new(4.0);
        progress.current = 3.0;
        let update = ProgressUpdate::reset(&progress);
        assert_eq!(update.current, 0.0);
        assert_eq!(update.target, 4.0);
        assert!(!update.completes());
    }
}
