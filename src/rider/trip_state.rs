//! Rider-facing projection of a trip's server-side status.
//!
//! Unlike the screen-local machines, this state is owned by the service: the
//! client polls it, de-duplicates, and fans the result out to every screen
//! that cares. Each screen pulls its own display model out of the shared
//! stream through a provider function that returns `None` for states the
//! screen is not responsible for, so its map/dialog streams stay silent
//! until its own variant arrives.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::interactors::TripInteractor;
use crate::map::{
    CameraUpdate, DrawableMarker, DrawablePath, MapSettings, MapStateProvider, MarkerIcon,
};
use crate::model::{LatLng, RouteInfo, TripId, TripLocations, VehicleInfo};
use crate::poll::SharedStatePoller;
use crate::state_machine::{project, Projection};
use crate::TRIP_STATE_POLL_INTERVAL;

/// The matched vehicle as the rider sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleMatch {
    pub position: LatLng,
    pub heading: Option<f64>,
    pub info: VehicleInfo,
    pub route: RouteInfo,
    /// Remaining stops on the vehicle's plan, in order.
    pub waypoints: Vec<LatLng>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderTripState {
    Unknown,
    WaitingForAssignment {
        locations: TripLocations,
    },
    DrivingToPickup {
        locations: TripLocations,
        vehicle: VehicleMatch,
    },
    WaitingForPickup {
        locations: TripLocations,
        vehicle: VehicleMatch,
    },
    DrivingToDropoff {
        locations: TripLocations,
        vehicle: VehicleMatch,
    },
    Completed {
        locations: TripLocations,
    },
}

impl RiderTripState {
    pub fn locations(&self) -> Option<&TripLocations> {
        match self {
            Self::Unknown => None,
            Self::WaitingForAssignment { locations }
            | Self::DrivingToPickup { locations, .. }
            | Self::WaitingForPickup { locations, .. }
            | Self::DrivingToDropoff { locations, .. }
            | Self::Completed { locations } => Some(locations),
        }
    }

    pub fn vehicle(&self) -> Option<&VehicleMatch> {
        match self {
            Self::DrivingToPickup { vehicle, .. }
            | Self::WaitingForPickup { vehicle, .. }
            | Self::DrivingToDropoff { vehicle, .. } => Some(vehicle),
            _ => None,
        }
    }
}

/// One polled trip-state loop shared by every subscriber on the screen.
pub struct TripStateStream {
    poller: SharedStatePoller<RiderTripState>,
}

impl TripStateStream {
    pub fn spawn(trip_id: TripId, trip_interactor: Arc<dyn TripInteractor>) -> Self {
        let poller = SharedStatePoller::spawn(
            RiderTripState::Unknown,
            TRIP_STATE_POLL_INTERVAL,
            move || {
                let interactor = Arc::clone(&trip_interactor);
                let trip_id = trip_id.clone();
                async move { interactor.trip_state_for(&trip_id).await }
            },
        );
        Self { poller }
    }

    pub fn subscribe(&self) -> watch::Receiver<RiderTripState> {
        self.poller.subscribe()
    }

    pub fn current(&self) -> RiderTripState {
        self.poller.current()
    }

    /// Per-screen filtered view of the shared stream.
    pub fn project<D, F>(&self, model_provider: F) -> Projection<D>
    where
        D: Send + 'static,
        F: Fn(&RiderTripState) -> Option<D> + Send + 'static,
    {
        project(self.poller.subscribe(), model_provider)
    }
}

// --- Per-screen display models ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaitingForAssignmentDisplay {
    pub locations: TripLocations,
}

pub fn waiting_for_assignment_model(state: &RiderTripState) -> Option<WaitingForAssignmentDisplay> {
    match state {
        RiderTripState::WaitingForAssignment { locations } => Some(WaitingForAssignmentDisplay {
            locations: locations.clone(),
        }),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedPhase {
    DrivingToPickup,
    WaitingForPickup,
    DrivingToDropoff,
}

/// Display model for the matched-to-vehicle family of screens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchedToVehicleDisplay {
    pub phase: MatchedPhase,
    pub locations: TripLocations,
    pub vehicle: VehicleMatch,
}

impl MatchedToVehicleDisplay {
    /// Where the vehicle is currently headed for this rider.
    pub fn focus(&self) -> LatLng {
        match self.phase {
            MatchedPhase::DrivingToPickup | MatchedPhase::WaitingForPickup => {
                self.locations.pickup.location
            }
            MatchedPhase::DrivingToDropoff => self.locations.dropoff.location,
        }
    }
}

pub fn matched_to_vehicle_model(state: &RiderTripState) -> Option<MatchedToVehicleDisplay> {
    let phase = match state {
        RiderTripState::DrivingToPickup { .. } => MatchedPhase::DrivingToPickup,
        RiderTripState::WaitingForPickup { .. } => MatchedPhase::WaitingForPickup,
        RiderTripState::DrivingToDropoff { .. } => MatchedPhase::DrivingToDropoff,
        _ => return None,
    };
    let locations = state.locations()?.clone();
    let vehicle = state.vehicle()?.clone();
    Some(MatchedToVehicleDisplay {
        phase,
        locations,
        vehicle,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripCompletedDisplay {
    pub locations: TripLocations,
}

pub fn trip_completed_model(state: &RiderTripState) -> Option<TripCompletedDisplay> {
    match state {
        RiderTripState::Completed { locations } => Some(TripCompletedDisplay {
            locations: locations.clone(),
        }),
        _ => None,
    }
}

// --- Map projection for the matched-to-vehicle screens ---

/// Feeds the shell's map adapter while the rider is matched to a vehicle.
/// Built from the screen's own filtered projection, so it only reacts to the
/// matched variants.
pub struct MatchedToVehicleMapLayer {
    settings: watch::Receiver<MapSettings>,
    camera: watch::Receiver<CameraUpdate>,
    markers: watch::Receiver<HashMap<String, DrawableMarker>>,
    paths: watch::Receiver<Vec<DrawablePath>>,
    forward: JoinHandle<()>,
}

impl MatchedToVehicleMapLayer {
    pub fn new(
        initial: MatchedToVehicleDisplay,
        mut updates: Projection<MatchedToVehicleDisplay>,
    ) -> Self {
        let (settings_tx, settings) = watch::channel(MapSettings {
            center_on_device: false,
            show_user_location: true,
        });
        let (camera_tx, camera) = watch::channel(camera_for(&initial));
        let (markers_tx, markers) = watch::channel(markers_for(&initial));
        let (paths_tx, paths) = watch::channel(paths_for(&initial));

        let forward = tokio::spawn(async move {
            // Settings are static for this screen; the sender just lives
            // with the loop so subscribers keep a live channel.
            let _settings_tx = settings_tx;
            while let Some(display) = updates.next().await {
                let _ = camera_tx.send(camera_for(&display));
                let _ = markers_tx.send(markers_for(&display));
                let _ = paths_tx.send(paths_for(&display));
            }
        });

        Self {
            settings,
            camera,
            markers,
            paths,
            forward,
        }
    }
}

impl Drop for MatchedToVehicleMapLayer {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

fn camera_for(display: &MatchedToVehicleDisplay) -> CameraUpdate {
    CameraUpdate::FitToBounds {
        points: vec![display.vehicle.position, display.focus()],
    }
}

fn markers_for(display: &MatchedToVehicleDisplay) -> HashMap<String, DrawableMarker> {
    let mut markers = HashMap::new();
    markers.insert(
        "vehicle".to_string(),
        DrawableMarker {
            position: display.vehicle.position,
            icon: MarkerIcon::Vehicle,
            heading: display.vehicle.heading,
        },
    );
    markers.insert(
        "pickup".to_string(),
        DrawableMarker {
            position: display.locations.pickup.location,
            icon: MarkerIcon::Pickup,
            heading: None,
        },
    );
    markers.insert(
        "dropoff".to_string(),
        DrawableMarker {
            position: display.locations.dropoff.location,
            icon: MarkerIcon::Dropoff,
            heading: None,
        },
    );
    markers
}

fn paths_for(display: &MatchedToVehicleDisplay) -> Vec<DrawablePath> {
    vec![DrawablePath {
        points: display.vehicle.route.polyline.clone(),
        dashed: false,
    }]
}

impl MapStateProvider for MatchedToVehicleMapLayer {
    fn map_settings(&self) -> watch::Receiver<MapSettings> {
        self.settings.clone()
    }

    fn camera_updates(&self) -> watch::Receiver<CameraUpdate> {
        self.camera.clone()
    }

    fn markers(&self) -> watch::Receiver<HashMap<String, DrawableMarker>> {
        self.markers.clone()
    }

    fn paths(&self) -> watch::Receiver<Vec<DrawablePath>> {
        self.paths.clone()
    }
}
