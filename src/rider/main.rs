//! Top-level rider screen: start screen, pre-trip search, or active trip.
//!
//! An active trip can appear without any local action (dispatch assigned one,
//! or the rider confirmed on another device), so this view-model continuously
//! polls the current-trip endpoint and injects detections into the same state
//! machine the UI events go through.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{instrument, warn};

use crate::error::TransitionError;
use crate::interactors::{GeocodeInteractor, TripInteractor};
use crate::model::{LatLng, NamedLocation, SessionContext, TripId, TripLocations};
use crate::poll::{poll_distinct, PollHandle};
use crate::state_machine::StateMachine;
use crate::CURRENT_TRIP_POLL_INTERVAL;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderMainState {
    StartScreen,
    PreTrip,
    OnTrip { trip_id: TripId },
}

pub struct RiderMainViewModel {
    machine: Arc<StateMachine<RiderMainState>>,
    context: Arc<SessionContext>,
    trip_interactor: Arc<dyn TripInteractor>,
    geocode_interactor: Arc<dyn GeocodeInteractor>,
    _trip_poll: PollHandle,
}

impl RiderMainViewModel {
    pub fn new(
        context: Arc<SessionContext>,
        trip_interactor: Arc<dyn TripInteractor>,
        geocode_interactor: Arc<dyn GeocodeInteractor>,
    ) -> Self {
        let machine = Arc::new(StateMachine::new(RiderMainState::StartScreen));

        let poll_interactor = Arc::clone(&trip_interactor);
        let poll_context = Arc::clone(&context);
        let sink_machine = Arc::clone(&machine);
        let trip_poll = poll_distinct(
            CURRENT_TRIP_POLL_INTERVAL,
            move || {
                let interactor = Arc::clone(&poll_interactor);
                let passenger = poll_context.passenger_id();
                async move { interactor.current_trip_for_passenger(&passenger).await }
            },
            move |trip_id: TripId| {
                // Externally-assigned trips look exactly like locally-created
                // ones once they reach the machine.
                sink_machine.transition(move |_| Ok(RiderMainState::OnTrip { trip_id }));
            },
        );

        Self {
            machine,
            context,
            trip_interactor,
            geocode_interactor,
            _trip_poll: trip_poll,
        }
    }

    #[instrument(skip(self))]
    pub fn start_location_search(&self) {
        self.machine.transition(|state| match state {
            RiderMainState::StartScreen => Ok(RiderMainState::PreTrip),
            other => Err(TransitionError::invalid("start_location_search", &other)),
        });
    }

    #[instrument(skip(self))]
    pub fn cancel_location_search(&self) {
        self.machine.transition(|state| match state {
            RiderMainState::PreTrip => Ok(RiderMainState::StartScreen),
            other => Err(TransitionError::invalid("cancel_location_search", &other)),
        });
    }

    /// Creates a trip for the confirmed pickup/dropoff pair. Geocoding is
    /// best-effort: a failed lookup degrades the display name, it never
    /// blocks trip creation.
    #[instrument(skip(self))]
    pub fn confirm_trip(&self, pickup: LatLng, dropoff: LatLng) {
        let trips = Arc::clone(&self.trip_interactor);
        let geocoder = Arc::clone(&self.geocode_interactor);
        let passenger = self.context.passenger_id();
        self.machine.async_transition(move |state| async move {
            match state {
                RiderMainState::PreTrip => {
                    let locations = TripLocations {
                        pickup: resolve_name(geocoder.as_ref(), pickup).await,
                        dropoff: resolve_name(geocoder.as_ref(), dropoff).await,
                    };
                    match trips.create_trip(&passenger, &locations).await {
                        Ok(trip_id) => Ok(RiderMainState::OnTrip { trip_id }),
                        Err(err) => {
                            warn!(error = %err, "trip creation failed; staying in pre-trip");
                            Ok(RiderMainState::PreTrip)
                        }
                    }
                }
                other => Err(TransitionError::invalid("confirm_trip", &other)),
            }
        });
    }

    /// Direct entry onto a trip, legal from any state (explicit creation
    /// elsewhere, or an external detection path).
    #[instrument(skip(self))]
    pub fn on_trip_created(&self, trip_id: TripId) {
        self.machine
            .transition(move |_| Ok(RiderMainState::OnTrip { trip_id }));
    }

    #[instrument(skip(self))]
    pub fn trip_finished(&self) {
        self.machine.transition(|state| match state {
            RiderMainState::OnTrip { .. } => Ok(RiderMainState::StartScreen),
            other => Err(TransitionError::invalid("trip_finished", &other)),
        });
    }

    pub fn observe(&self) -> watch::Receiver<RiderMainState> {
        self.machine.observe()
    }

    pub fn current(&self) -> RiderMainState {
        self.machine.current()
    }
}

async fn resolve_name(geocoder: &dyn GeocodeInteractor, location: LatLng) -> NamedLocation {
    match geocoder.reverse_geocode(location).await {
        Ok(name) => NamedLocation::new(location, name),
        Err(err) => {
            warn!(error = %err, "reverse geocode failed; using coordinates");
            NamedLocation::unnamed(location)
        }
    }
}
