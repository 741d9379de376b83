//! Config Entry State Machine
//!
//! Enforces valid state transitions for the ConfigEntry lifecycle:
//!
//! ```text
//! NotLoaded → SetupInProgress → Loaded
//!                            ↘ SetupError → SetupInProgress (after reconfigure)
//! NotLoaded → MigrationError (terminal)
//!
//! Loaded/SetupError → UnloadInProgress → NotLoaded
//! ```

use crate::entry::ConfigEntryState;
use thiserror::Error;

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
pub struct InvalidTransition {
    pub from: ConfigEntryState,
    pub to: ConfigEntryState,
    pub reason: &'static str,
}

impl ConfigEntryState {
    /// Attempt a transition to a new state.
    pub fn try_transition(
        self,
        to: ConfigEntryState,
    ) -> Result<ConfigEntryState, InvalidTransition> {
        use ConfigEntryState::*;

        let valid = matches!(
            (self, to),
            (NotLoaded, SetupInProgress)
                | (NotLoaded, MigrationError)
                | (SetupInProgress, Loaded)
                | (SetupInProgress, SetupError)
                | (SetupError, SetupInProgress)
                | (SetupError, UnloadInProgress)
                | (Loaded, UnloadInProgress)
                | (UnloadInProgress, NotLoaded)
        );

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition {
                from: self,
                to,
                reason: Self::transition_error_reason(self, to),
            })
        }
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition_to(self, to: ConfigEntryState) -> bool {
        self.try_transition(to).is_ok()
    }

    fn transition_error_reason(from: ConfigEntryState, to: ConfigEntryState) -> &'static str {
        use ConfigEntryState::*;

        match (from, to) {
            (MigrationError, _) => "MigrationError is terminal - entry data is unusable",
            (NotLoaded, Loaded) => "Cannot jump to Loaded - must go through SetupInProgress",
            (Loaded, SetupInProgress) => "Already loaded - unload first before re-setup",
            (Loaded, NotLoaded) => "Cannot jump to NotLoaded - must go through UnloadInProgress",
            (SetupInProgress, NotLoaded) => {
                "Setup in progress - must complete before returning to NotLoaded"
            }
            _ => "Invalid state transition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConfigEntryState::*;

    #[test]
    fn test_setup_path() {
        assert_eq!(NotLoaded.try_transition(SetupInProgress), Ok(SetupInProgress));
        assert!(SetupInProgress.can_transition_to(Loaded));
        assert!(SetupInProgress.can_transition_to(SetupError));
    }

    #[test]
    fn test_failed_setup_can_retry_or_unload() {
        assert!(SetupError.can_transition_to(SetupInProgress));
        assert!(SetupError.can_transition_to(UnloadInProgress));
    }

    #[test]
    fn test_unload_path() {
        assert!(Loaded.can_transition_to(UnloadInProgress));
        assert!(UnloadInProgress.can_transition_to(NotLoaded));
    }

    #[test]
    fn test_invalid_jumps() {
        let err = NotLoaded.try_transition(Loaded).unwrap_err();
        assert_eq!(err.from, NotLoaded);
        assert!(err.reason.contains("SetupInProgress"));

        assert!(!Loaded.can_transition_to(SetupInProgress));
        assert!(!Loaded.can_transition_to(NotLoaded));
    }

    #[test]
    fn test_migration_error_is_terminal() {
        assert!(NotLoaded.can_transition_to(MigrationError));
        for to in [NotLoaded, SetupInProgress, Loaded, SetupError, UnloadInProgress] {
            assert!(!MigrationError.can_transition_to(to));
        }
    }
}
