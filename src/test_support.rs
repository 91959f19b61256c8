//! Scripted fakes shared by the unit-test modules. Failure injection follows
//! the atomic-flag pattern so tests can flip behavior mid-flight.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::driver::plan::PlanStep;
use crate::driver::{FinishedDrivingListener, RegistrationListener};
use crate::error::InteractorError;
use crate::interactors::{
    DeviceLocator, DriverVehicleInteractor, GeocodeInteractor, RouteInteractor, TripInteractor,
};
use crate::model::{
    FleetId, LatLng, PassengerId, ResolvedFleet, RouteInfo, SessionContext, StepId, TripId,
    TripLocations, VehicleId, VehicleRegistration, VehicleStatus,
};
use crate::rider::trip_state::RiderTripState;
use crate::rider::TripFinishedListener;

pub fn test_context() -> Arc<SessionContext> {
    SessionContext::new(
        "user-1",
        ResolvedFleet {
            fleet_id: FleetId::new("fleet-1"),
        },
    )
}

fn injected() -> InteractorError {
    InteractorError::Network("injected failure".into())
}

#[derive(Default)]
pub struct MockVehicleInteractor {
    pub status: Mutex<Option<VehicleStatus>>,
    pub status_calls: AtomicU32,
    pub ready_calls: AtomicU32,
    pub not_ready_calls: AtomicU32,
    pub register_calls: AtomicU32,
    pub fail_ready: AtomicBool,
    pub fail_not_ready: AtomicBool,
    pub fail_register: AtomicBool,
    pub delay_register_ms: AtomicU64,
    pub plan_steps: Mutex<Vec<PlanStep>>,
    pub completed_steps: Mutex<Vec<Vec<StepId>>>,
}

impl MockVehicleInteractor {
    pub fn set_status(&self, status: VehicleStatus) {
        *self.status.lock().unwrap() = Some(status);
    }

    pub fn set_plan_steps(&self, steps: Vec<PlanStep>) {
        *self.plan_steps.lock().unwrap() = steps;
    }
}

#[async_trait]
impl DriverVehicleInteractor for MockVehicleInteractor {
    async fn vehicle_status(&self, _vehicle: &VehicleId) -> Result<VehicleStatus, InteractorError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let status = *self.status.lock().unwrap();
        status.ok_or_else(|| InteractorError::Unavailable("status not scripted".into()))
    }

    async fn register_vehicle(
        &self,
        _vehicle: &VehicleId,
        _registration: &VehicleRegistration,
    ) -> Result<(), InteractorError> {
        let delay = self.delay_register_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(())
    }

    async fn mark_vehicle_ready(&self, _vehicle: &VehicleId) -> Result<(), InteractorError> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ready.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(())
    }

    async fn mark_vehicle_not_ready(&self, _vehicle: &VehicleId) -> Result<(), InteractorError> {
        self.not_ready_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_not_ready.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(())
    }

    async fn vehicle_plan_steps(
        &self,
        _vehicle: &VehicleId,
    ) -> Result<Vec<PlanStep>, InteractorError> {
        Ok(self.plan_steps.lock().unwrap().clone())
    }

    async fn complete_steps(
        &self,
        _vehicle: &VehicleId,
        steps: &[StepId],
    ) -> Result<(), InteractorError> {
        self.completed_steps.lock().unwrap().push(steps.to_vec());
        Ok(())
    }
}

pub struct MockTripInteractor {
    pub current_trip: Mutex<Option<TripId>>,
    pub trip_state: Mutex<RiderTripState>,
    pub create_calls: AtomicU32,
    pub cancel_calls: AtomicU32,
    pub edit_calls: AtomicU32,
    pub fail_create: AtomicBool,
    pub fail_cancel: AtomicBool,
    pub fail_edit: AtomicBool,
}

impl Default for MockTripInteractor {
    fn default() -> Self {
        Self {
            current_trip: Mutex::new(None),
            trip_state: Mutex::new(RiderTripState::Unknown),
            create_calls: AtomicU32::new(0),
            cancel_calls: AtomicU32::new(0),
            edit_calls: AtomicU32::new(0),
            fail_create: AtomicBool::new(false),
            fail_cancel: AtomicBool::new(false),
            fail_edit: AtomicBool::new(false),
        }
    }
}

impl MockTripInteractor {
    pub fn set_current_trip(&self, trip: Option<TripId>) {
        *self.current_trip.lock().unwrap() = trip;
    }

    pub fn set_trip_state(&self, state: RiderTripState) {
        *self.trip_state.lock().unwrap() = state;
    }
}

#[async_trait]
impl TripInteractor for MockTripInteractor {
    async fn create_trip(
        &self,
        _passenger: &PassengerId,
        _locations: &TripLocations,
    ) -> Result<TripId, InteractorError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(injected());
        }
        // The service assigns opaque ids.
        Ok(TripId::generate())
    }

    async fn cancel_trip(&self, _trip: &TripId) -> Result<(), InteractorError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(())
    }

    async fn current_trip_for_passenger(
        &self,
        _passenger: &PassengerId,
    ) -> Result<Option<TripId>, InteractorError> {
        Ok(self.current_trip.lock().unwrap().clone())
    }

    async fn edit_pickup(
        &self,
        trip: &TripId,
        _new_pickup: LatLng,
    ) -> Result<TripId, InteractorError> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(InteractorError::Timeout);
        }
        Ok(TripId::new(format!("{trip}-edited")))
    }

    async fn trip_state_for(&self, _trip: &TripId) -> Result<RiderTripState, InteractorError> {
        Ok(self.trip_state.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MockRouteInteractor {
    pub fail: AtomicBool,
    pub route_calls: AtomicU32,
}

#[async_trait]
impl RouteInteractor for MockRouteInteractor {
    async fn find_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<RouteInfo, InteractorError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(RouteInfo {
            polyline: vec![origin, destination],
            travel_time_ms: 60_000,
            distance_meters: 1_000.0,
        })
    }
}

#[derive(Default)]
pub struct MockGeocodeInteractor {
    pub fail: AtomicBool,
}

#[async_trait]
impl GeocodeInteractor for MockGeocodeInteractor {
    async fn reverse_geocode(&self, location: LatLng) -> Result<String, InteractorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(InteractorError::NotFound("no address".into()));
        }
        Ok(format!("near {:.2}, {:.2}", location.lat(), location.lng()))
    }
}

pub struct MockDeviceLocator {
    pub fail_last_known: AtomicBool,
    location: watch::Sender<Option<LatLng>>,
}

impl Default for MockDeviceLocator {
    fn default() -> Self {
        let (location, _) = watch::channel(Some(Self::home()));
        Self {
            fail_last_known: AtomicBool::new(false),
            location,
        }
    }
}

impl MockDeviceLocator {
    pub fn home() -> LatLng {
        LatLng::new(37.7, -122.4).unwrap()
    }

    pub fn move_to(&self, location: LatLng) {
        let _ = self.location.send(Some(location));
    }
}

#[async_trait]
impl DeviceLocator for MockDeviceLocator {
    fn observe_location(&self) -> watch::Receiver<Option<LatLng>> {
        self.location.subscribe()
    }

    async fn last_known_location(&self) -> Result<LatLng, InteractorError> {
        if self.fail_last_known.load(Ordering::SeqCst) {
            return Err(InteractorError::NotFound("no fix yet".into()));
        }
        Ok(Self::home())
    }
}

#[derive(Default)]
pub struct CountingListener {
    pub registrations: AtomicU32,
    pub finished_drives: AtomicU32,
    pub finished_trips: AtomicU32,
}

impl RegistrationListener for CountingListener {
    fn registration_finished(&self) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }
}

impl FinishedDrivingListener for CountingListener {
    fn finished_driving(&self) {
        self.finished_drives.fetch_add(1, Ordering::SeqCst);
    }
}

impl TripFinishedListener for CountingListener {
    fn trip_finished(&self) {
        self.finished_trips.fetch_add(1, Ordering::SeqCst);
    }
}
