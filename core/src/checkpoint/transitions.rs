//! Status transition rules.

use thiserror::Error;

use super::types::Status;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: Status, to: Status },
    #[error("cannot leave settled state {state}")]
    FromSettledState { state: Status },
}

pub struct StatusTransition;

impl StatusTransition {
    /// Forward-only lifecycle. `Failed -> InProgress` is a retry on resume;
    /// `InProgress -> InProgress` restarts work interrupted by a cancel.
    pub fn validate(from: Status, to: Status) -> Result<(), TransitionError> {
        if from.is_settled() {
            return Err(TransitionError::FromSettledState { state: from });
        }

        let is_valid = matches!(
            (from, to),
            (Status::Pending, Status::InProgress)
                | (Status::Pending, Status::Skipped)
                | (Status::InProgress, Status::InProgress)
                | (Status::InProgress, Status::Completed)
                | (Status::InProgress, Status::Failed)
                | (Status::Failed, Status::InProgress)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }
}
