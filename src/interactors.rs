//! Remote collaborator seams. Every network-backed service the view-models
//! consume is an async trait injected by the shell; tests substitute scripted
//! fakes. Wire formats live behind these boundaries and are not modeled here.

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::warn;

use crate::driver::plan::PlanStep;
use crate::error::InteractorError;
use crate::model::{
    LatLng, PassengerId, RouteInfo, TripId, TripLocations, VehicleId, VehicleRegistration,
    VehicleStatus,
};
use crate::rider::trip_state::RiderTripState;

/// Trip CRUD plus the poll targets the rider screens synchronize against.
#[async_trait]
pub trait TripInteractor: Send + Sync {
    async fn create_trip(
        &self,
        passenger: &PassengerId,
        locations: &TripLocations,
    ) -> Result<TripId, InteractorError>;

    async fn cancel_trip(&self, trip: &TripId) -> Result<(), InteractorError>;

    /// Poll target: the trip currently assigned to this passenger, if any.
    async fn current_trip_for_passenger(
        &self,
        passenger: &PassengerId,
    ) -> Result<Option<TripId>, InteractorError>;

    /// Moves the pickup of an active trip. The service reissues the trip
    /// under a new id.
    async fn edit_pickup(
        &self,
        trip: &TripId,
        new_pickup: LatLng,
    ) -> Result<TripId, InteractorError>;

    /// Poll target: the server-side status of a trip projected into the
    /// rider-facing state model.
    async fn trip_state_for(&self, trip: &TripId) -> Result<RiderTripState, InteractorError>;
}

/// Driver-side vehicle lifecycle and plan queries.
#[async_trait]
pub trait DriverVehicleInteractor: Send + Sync {
    async fn vehicle_status(&self, vehicle: &VehicleId) -> Result<VehicleStatus, InteractorError>;

    async fn register_vehicle(
        &self,
        vehicle: &VehicleId,
        registration: &VehicleRegistration,
    ) -> Result<(), InteractorError>;

    async fn mark_vehicle_ready(&self, vehicle: &VehicleId) -> Result<(), InteractorError>;

    async fn mark_vehicle_not_ready(&self, vehicle: &VehicleId) -> Result<(), InteractorError>;

    /// Raw plan steps for this vehicle, in service order. See
    /// `driver::plan::build_waypoints` for the waypoint collapse.
    async fn vehicle_plan_steps(
        &self,
        vehicle: &VehicleId,
    ) -> Result<Vec<PlanStep>, InteractorError>;

    /// Acknowledges every step merged into a finished waypoint atomically.
    async fn complete_steps(
        &self,
        vehicle: &VehicleId,
        steps: &[crate::model::StepId],
    ) -> Result<(), InteractorError>;
}

#[async_trait]
pub trait RouteInteractor: Send + Sync {
    async fn find_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<RouteInfo, InteractorError>;
}

#[async_trait]
pub trait GeocodeInteractor: Send + Sync {
    /// Resolves a coordinate to a human-readable place name.
    async fn reverse_geocode(&self, location: LatLng) -> Result<String, InteractorError>;
}

/// Device location source: a continuous stream plus a single-shot accessor.
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    fn observe_location(&self) -> watch::Receiver<Option<LatLng>>;

    async fn last_known_location(&self) -> Result<LatLng, InteractorError>;
}

/// Runs `op` up to `attempts` times with no backoff, returning the first
/// success or the final error. User-initiated write paths use this; read
/// paths rely on their polling cadence instead.
pub async fn retry_immediate<T, F, Fut>(attempts: u32, op: F) -> Result<T, InteractorError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, InteractorError>>,
{
    debug_assert!(attempts > 0);
    let mut last_error = InteractorError::Unavailable("no attempts made".into());
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, max = attempts, error = %err, "attempt failed");
                last_error = err;
            }
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry_immediate(5, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(InteractorError::Timeout)
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_exhausts_and_returns_final_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_immediate(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(InteractorError::Network("reset".into())) }
        })
        .await;
        assert!(matches!(result, Err(InteractorError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
