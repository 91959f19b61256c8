//! Rider journey wired end to end: booking, screen dispatch, live trip
//! tracking, pickup editing, and cancellation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use ridecore::coordinator::{rider_screen_for, Coordinator, RiderScreen, ScreenPresenter};
use ridecore::error::InteractorError;
use ridecore::interactors::{GeocodeInteractor, TripInteractor};
use ridecore::model::{
    FleetId, LatLng, NamedLocation, PassengerId, ResolvedFleet, RouteInfo, SessionContext,
    TripId, TripLocations, VehicleInfo,
};
use ridecore::rider::main::{RiderMainState, RiderMainViewModel};
use ridecore::rider::on_trip::{OnTripState, OnTripViewModel};
use ridecore::rider::trip_state::{RiderTripState, TripStateStream, VehicleMatch};
use ridecore::rider::TripFinishedListener;

fn context() -> Arc<SessionContext> {
    SessionContext::new(
        "rider-3",
        ResolvedFleet {
            fleet_id: FleetId::new("fleet-east"),
        },
    )
}

fn locations() -> TripLocations {
    TripLocations {
        pickup: NamedLocation::new(LatLng::new(37.70, -122.40).unwrap(), "Home"),
        dropoff: NamedLocation::new(LatLng::new(37.78, -122.41).unwrap(), "Work"),
    }
}

fn matched_vehicle() -> VehicleMatch {
    let position = LatLng::new(37.69, -122.39).unwrap();
    VehicleMatch {
        position,
        heading: Some(90.0),
        info: VehicleInfo {
            license_plate: "7ABC123".into(),
            contact_phone: None,
        },
        route: RouteInfo {
            polyline: vec![position, locations().pickup.location],
            travel_time_ms: 180_000,
            distance_meters: 1_400.0,
        },
        waypoints: vec![locations().pickup.location, locations().dropoff.location],
    }
}

/// In-memory trip service. Creating a trip makes it the passenger's current
/// trip, so the booking path and the poll path agree.
#[derive(Default)]
struct FakeTripService {
    current_trip: Mutex<Option<TripId>>,
    trip_state: Mutex<Option<RiderTripState>>,
    create_calls: AtomicU32,
    cancel_calls: AtomicU32,
}

impl FakeTripService {
    fn set_trip_state(&self, state: RiderTripState) {
        *self.trip_state.lock().unwrap() = Some(state);
    }
}

#[async_trait]
impl TripInteractor for FakeTripService {
    async fn create_trip(
        &self,
        _passenger: &PassengerId,
        _locations: &TripLocations,
    ) -> Result<TripId, InteractorError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
        let trip_id = TripId::new(format!("trip-{n}"));
        *self.current_trip.lock().unwrap() = Some(trip_id.clone());
        Ok(trip_id)
    }

    async fn cancel_trip(&self, _trip: &TripId) -> Result<(), InteractorError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        *self.current_trip.lock().unwrap() = None;
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
        let reissued = TripId::new(format!("{trip}-v2"));
        *self.current_trip.lock().unwrap() = Some(reissued.clone());
        Ok(reissued)
    }

    async fn trip_state_for(&self, _trip: &TripId) -> Result<RiderTripState, InteractorError> {
        let state = self.trip_state.lock().unwrap().clone();
        state.ok_or_else(|| InteractorError::Unavailable("trip state unknown".into()))
    }
}

struct FixedGeocoder;

#[async_trait]
impl GeocodeInteractor for FixedGeocoder {
    async fn reverse_geocode(&self, _location: LatLng) -> Result<String, InteractorError> {
        Ok("123 Main St".into())
    }
}

/// Bridges the on-trip screen back into the main state machine.
struct ForwardToMain(Arc<RiderMainViewModel>);

impl TripFinishedListener for ForwardToMain {
    fn trip_finished(&self) {
        self.0.trip_finished();
    }
}

struct RecordingPresenter {
    shown: Mutex<Vec<RiderScreen>>,
}

impl ScreenPresenter<RiderScreen> for RecordingPresenter {
    fn present(&self, screen: RiderScreen) {
        self.shown.lock().unwrap().push(screen);
    }
}

async fn settle(vm: &RiderMainViewModel, want: RiderMainState) {
    let mut rx = vm.observe();
    timeout(Duration::from_secs(60), rx.wait_for(|s| *s == want))
        .await
        .expect("state never reached")
        .expect("view-model dropped");
}

#[tokio::test(start_paused = true)]
async fn booking_drives_the_screen_stack() {
    let service = Arc::new(FakeTripService::default());
    let main = Arc::new(RiderMainViewModel::new(
        context(),
        service.clone(),
        Arc::new(FixedGeocoder),
    ));

    let presenter = Arc::new(RecordingPresenter {
        shown: Mutex::new(Vec::new()),
    });
    let _coordinator = Coordinator::attach(
        main.observe(),
        rider_screen_for,
        presenter.clone() as Arc<dyn ScreenPresenter<RiderScreen>>,
    );

    main.start_location_search();
    settle(&main, RiderMainState::PreTrip).await;

    main.confirm_trip(
        locations().pickup.location,
        locations().dropoff.location,
    );
    settle(
        &main,
        RiderMainState::OnTrip {
            trip_id: TripId::new("trip-0"),
        },
    )
    .await;
    assert_eq!(service.create_calls.load(Ordering::SeqCst), 1);

    timeout(Duration::from_secs(60), async {
        loop {
            let shown = presenter.shown.lock().unwrap().clone();
            if shown.len() >= 3 {
                break shown;
            }
            drop(shown);
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("screen stack never completed");

    let shown = presenter.shown.lock().unwrap();
    assert_eq!(
        shown.as_slice(),
        &[
            RiderScreen::Start,
            RiderScreen::LocationSearch,
            RiderScreen::OnTrip {
                trip_id: TripId::new("trip-0")
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn cancelling_returns_to_the_start_screen() {
    let service = Arc::new(FakeTripService::default());
    let main = Arc::new(RiderMainViewModel::new(
        context(),
        service.clone(),
        Arc::new(FixedGeocoder),
    ));

    main.on_trip_created(TripId::new("trip-9"));
    settle(
        &main,
        RiderMainState::OnTrip {
            trip_id: TripId::new("trip-9"),
        },
    )
    .await;

    let on_trip = OnTripViewModel::new(
        TripId::new("trip-9"),
        service.clone(),
        Arc::new(ForwardToMain(Arc::clone(&main))),
    );
    on_trip.cancel_trip();

    settle(&main, RiderMainState::StartScreen).await;
    assert_eq!(service.cancel_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn pickup_edit_lands_on_the_reissued_trip() {
    let service = Arc::new(FakeTripService::default());
    let main = Arc::new(RiderMainViewModel::new(
        context(),
        service.clone(),
        Arc::new(FixedGeocoder),
    ));
    let on_trip = OnTripViewModel::new(
        TripId::new("trip-4"),
        service.clone(),
        Arc::new(ForwardToMain(Arc::clone(&main))),
    );

    on_trip.edit_pickup();
    on_trip.confirm_pickup_edit(LatLng::new(37.71, -122.40).unwrap());

    let mut rx = on_trip.observe();
    timeout(
        Duration::from_secs(60),
        rx.wait_for(|s| {
            *s == OnTripState::CurrentTrip {
                trip_id: TripId::new("trip-4-v2"),
            }
        }),
    )
    .await
    .expect("edit never landed")
    .expect("screen dropped");
}

#[tokio::test(start_paused = true)]
async fn trip_state_stream_tracks_the_lifecycle() {
    let service = Arc::new(FakeTripService::default());
    service.set_trip_state(RiderTripState::WaitingForAssignment {
        locations: locations(),
    });

    let stream = TripStateStream::spawn(TripId::new("trip-1"), service.clone());
    let mut states = stream.subscribe();

    timeout(
        Duration::from_secs(60),
        states.wait_for(|s| matches!(s, RiderTripState::WaitingForAssignment { .. })),
    )
    .await
    .expect("assignment phase never observed")
    .expect("stream dropped");

    service.set_trip_state(RiderTripState::DrivingToPickup {
        locations: locations(),
        vehicle: matched_vehicle(),
    });
    timeout(
        Duration::from_secs(60),
        states.wait_for(|s| matches!(s, RiderTripState::DrivingToPickup { .. })),
    )
    .await
    .expect("pickup phase never observed")
    .expect("stream dropped");

    service.set_trip_state(RiderTripState::Completed {
        locations: locations(),
    });
    timeout(
        Duration::from_secs(60),
        states.wait_for(|s| matches!(s, RiderTripState::Completed { .. })),
    )
    .await
    .expect("completion never observed")
    .expect("stream dropped");
}
