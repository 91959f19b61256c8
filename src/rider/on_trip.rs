//! Active-trip screen: pickup editing and trip cancellation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{instrument, warn};

use crate::error::TransitionError;
use crate::interactors::{retry_immediate, TripInteractor};
use crate::model::{LatLng, TripId};
use crate::rider::TripFinishedListener;
use crate::state_machine::StateMachine;
use crate::MAX_EDIT_PICKUP_ATTEMPTS;

/// Every variant carries the id of the trip the screen is on; a successful
/// pickup edit swaps it for the reissued trip's id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnTripState {
    CurrentTrip { trip_id: TripId },
    EditingPickup { trip_id: TripId },
    UpdatingPickup { trip_id: TripId, new_pickup: LatLng },
}

impl OnTripState {
    pub fn trip_id(&self) -> &TripId {
        match self {
            Self::CurrentTrip { trip_id }
            | Self::EditingPickup { trip_id }
            | Self::UpdatingPickup { trip_id, .. } => trip_id,
        }
    }
}

pub struct OnTripViewModel {
    machine: StateMachine<OnTripState>,
    trip_interactor: Arc<dyn TripInteractor>,
    listener: Arc<dyn TripFinishedListener>,
}

impl OnTripViewModel {
    pub fn new(
        trip_id: TripId,
        trip_interactor: Arc<dyn TripInteractor>,
        listener: Arc<dyn TripFinishedListener>,
    ) -> Self {
        Self {
            machine: StateMachine::new(OnTripState::CurrentTrip { trip_id }),
            trip_interactor,
            listener,
        }
    }

    #[instrument(skip(self))]
    pub fn edit_pickup(&self) {
        self.machine.transition(|state| match state {
            OnTripState::CurrentTrip { trip_id } => Ok(OnTripState::EditingPickup { trip_id }),
            other => Err(TransitionError::invalid("edit_pickup", &other)),
        });
    }

    #[instrument(skip(self))]
    pub fn cancel_pickup_edit(&self) {
        self.machine.transition(|state| match state {
            OnTripState::EditingPickup { trip_id } => Ok(OnTripState::CurrentTrip { trip_id }),
            other => Err(TransitionError::invalid("cancel_pickup_edit", &other)),
        });
    }

    /// Commits the new pickup location. The remote edit is retried up to
    /// `MAX_EDIT_PICKUP_ATTEMPTS` times back to back; if every attempt fails
    /// the screen reverts to the unedited trip.
    #[instrument(skip(self))]
    pub fn confirm_pickup_edit(&self, new_pickup: LatLng) {
        self.machine.transition(move |state| match state {
            OnTripState::EditingPickup { trip_id } => Ok(OnTripState::UpdatingPickup {
                trip_id,
                new_pickup,
            }),
            other => Err(TransitionError::invalid("confirm_pickup_edit", &other)),
        });

        let trips = Arc::clone(&self.trip_interactor);
        self.machine.async_transition(move |state| async move {
            match state {
                OnTripState::UpdatingPickup {
                    trip_id,
                    new_pickup,
                } => {
                    let edit =
                        retry_immediate(MAX_EDIT_PICKUP_ATTEMPTS, || {
                            trips.edit_pickup(&trip_id, new_pickup)
                        })
                        .await;
                    match edit {
                        Ok(new_trip_id) => Ok(OnTripState::CurrentTrip {
                            trip_id: new_trip_id,
                        }),
                        Err(err) => {
                            warn!(error = %err, "pickup edit failed; reverting");
                            Ok(OnTripState::CurrentTrip { trip_id })
                        }
                    }
                }
                other => Err(TransitionError::invalid("confirm_pickup_edit", &other)),
            }
        });
    }

    /// Cancels the trip. On success the trip-finished listener fires and the
    /// owner dismisses this screen; a failed cancellation is absorbed by the
    /// machine and leaves the screen where it was.
    #[instrument(skip(self))]
    pub fn cancel_trip(&self) {
        let trips = Arc::clone(&self.trip_interactor);
        let listener = Arc::clone(&self.listener);
        self.machine.async_transition(move |state| async move {
            match state {
                OnTripState::CurrentTrip { trip_id } => {
                    trips.cancel_trip(&trip_id).await?;
                    listener.trip_finished();
                    Ok(OnTripState::CurrentTrip { trip_id })
                }
                other => Err(TransitionError::invalid("cancel_trip", &other)),
            }
        });
    }

    pub fn observe(&self) -> watch::Receiver<OnTripState> {
        self.machine.observe()
    }

    pub fn current(&self) -> OnTripState {
        self.machine.current()
    }
}
