#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod coordinator;
pub mod driver;
pub mod error;
pub mod interactors;
pub mod map;
pub mod model;
pub mod poll;
pub mod rider;
pub mod state_machine;

#[cfg(test)]
mod test_support;

use std::time::Duration;

pub use error::{InteractorError, PlanError, TransitionError};
pub use state_machine::StateMachine;

/// How often the driver shell re-checks the vehicle's registration and
/// readiness while the main state is still unresolved.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How often the rider shell looks for a trip created out-of-band (another
/// device, support desk).
pub const CURRENT_TRIP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How often an active trip's lifecycle state is refreshed.
pub const TRIP_STATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pickup edits are retried back to back before the screen gives up and
/// reverts to the unedited trip.
pub const MAX_EDIT_PICKUP_ATTEMPTS: u32 = 5;
