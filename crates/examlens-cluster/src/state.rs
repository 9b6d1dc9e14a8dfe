//! Scope run state machine with validated transitions.
//!
//! Idle -> Loading -> Grouping -> Building -> Persisted
//! Loading/Grouping/Building -> Failed

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Lifecycle of one (subject, module) clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeState {
    Idle,
    Loading,
    Grouping,
    Building,
    /// Clusters are complete and the caller may replace the stored set.
    Persisted,
    Failed,
}

impl ScopeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Grouping => "grouping",
            Self::Building => "building",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }

    /// Validate and perform a transition.
    pub fn advance(&mut self, to: ScopeState) -> Result<(), ClusterError> {
        validate_transition(*self, to)?;
        tracing::debug!(from = self.as_str(), to = to.as_str(), "Scope state transition");
        *self = to;
        Ok(())
    }
}

/// Validate that a state transition is allowed.
pub fn validate_transition(from: ScopeState, to: ScopeState) -> Result<(), ClusterError> {
    use crate::state::ScopeState::*;

    let valid = matches!(
        (from, to),
        (Idle, Loading)
            | (Loading, Grouping)
            | (Grouping, Building)
            | (Building, Persisted)
            | (Loading, Failed)
            | (Grouping, Failed)
            | (Building, Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(ClusterError::PreconditionViolation(format!(
            "invalid scope transition {} -> {}",
            from.as_str(),
            to.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ScopeState::*;

    #[test]
    fn test_happy_path() {
        let mut state = Idle;
        for next in [Loading, Grouping, Building, Persisted] {
            state.advance(next).unwrap();
        }
        assert_eq!(state, Persisted);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_any_active_state_can_fail() {
        for from in [Loading, Grouping, Building] {
            assert!(validate_transition(from, Failed).is_ok());
        }
    }

    #[test]
    fn test_idle_cannot_fail_or_skip() {
        assert!(validate_transition(Idle, Failed).is_err());
        assert!(validate_transition(Idle, Grouping).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in [Idle, Loading, Grouping, Building, Persisted, Failed] {
            assert!(validate_transition(Persisted, to).is_err());
            assert!(validate_transition(Failed, to).is_err());
        }
    }

    #[test]
    fn test_no_backwards_moves() {
        assert!(validate_transition(Building, Grouping).is_err());
        assert!(validate_transition(Grouping, Loading).is_err());
    }

    #[test]
    fn test_failed_advance_leaves_state_untouched() {
        let mut state = Grouping;
        assert!(state.advance(Persisted).is_err());
        assert_eq!(state, Grouping);
    }
}
