//! Rider-side lifecycle view-models.

pub mod main;
pub mod on_trip;
pub mod trip_state;

/// Notified when the active trip ends (completion or cancellation) so the
/// owning screen can fall back to the start screen.
pub trait TripFinishedListener: Send + Sync {
    fn trip_finished(&self);
}
