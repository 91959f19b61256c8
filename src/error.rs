use thiserror::Error;

/// Failure of a single state-machine transition.
///
/// These never escape the machine: the transition worker logs them and keeps
/// the prior state (see `state_machine`). Guard violations are expected in
/// normal operation — a stale tap or a poll result that raced a user action
/// simply loses.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("invalid transition in {operation}: current state is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    #[error(transparent)]
    Interactor(#[from] InteractorError),
}

impl TransitionError {
    pub fn invalid(operation: &'static str, state: &impl std::fmt::Debug) -> Self {
        Self::InvalidTransition {
            operation,
            state: format!("{state:?}"),
        }
    }
}

/// Failure of a remote interactor call (trip service, vehicle service,
/// routing, geocoding).
#[derive(Debug, Clone, Error)]
pub enum InteractorError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response from service: {0}")]
    InvalidResponse(String),
}

impl InteractorError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::Unavailable(_)
        )
    }
}

/// Malformed upstream driver-plan data. Fatal for the derivation: a plan
/// either parses completely or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("drive-to-location step {step_id} has no following pickup or dropoff step")]
    DanglingDriveStep { step_id: String },

    #[error(
        "drive-to-location step {step_id} for trip {expected_trip} is followed by \
         step {next_step_id} for trip {found_trip}"
    )]
    TripMismatch {
        step_id: String,
        expected_trip: String,
        next_step_id: String,
        found_trip: String,
    },
}
