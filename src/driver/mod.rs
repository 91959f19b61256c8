//! Driver-side lifecycle view-models. Each screen owns one state machine
//! over a closed state enum; parent screens react to child outcomes through
//! the listener seams below rather than shared state.

pub mod driving;
pub mod idle;
pub mod main;
pub mod offline;
pub mod plan;
pub mod vehicle_unregistered;

/// Notified when vehicle registration completes; the owning screen swaps to
/// the offline flow.
pub trait RegistrationListener: Send + Sync {
    fn registration_finished(&self);
}

/// Notified when the driver confirms arrival at the current waypoint.
pub trait FinishedDrivingListener: Send + Sync {
    fn finished_driving(&self);
}
