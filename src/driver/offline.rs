//! Offline screen: the driver takes the vehicle online from here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{instrument, warn};

use crate::error::TransitionError;
use crate::interactors::DriverVehicleInteractor;
use crate::model::SessionContext;
use crate::state_machine::StateMachine;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineState {
    Offline,
    GoingOnline,
    Online,
    FailedToGoOnline,
}

pub struct OfflineViewModel {
    machine: StateMachine<OfflineState>,
    context: Arc<SessionContext>,
    vehicle_interactor: Arc<dyn DriverVehicleInteractor>,
}

impl OfflineViewModel {
    pub fn new(
        context: Arc<SessionContext>,
        vehicle_interactor: Arc<dyn DriverVehicleInteractor>,
    ) -> Self {
        Self {
            machine: StateMachine::new(OfflineState::Offline),
            context,
            vehicle_interactor,
        }
    }

    /// Marks the vehicle ready. Issues exactly one service request per call
    /// accepted from `Offline` or `FailedToGoOnline`; calls while already
    /// `GoingOnline` or `Online` are dropped by the state guard, so no
    /// duplicate request is ever sent.
    #[instrument(skip(self), fields(vehicle = %self.context.vehicle_id()))]
    pub fn go_online(&self) {
        self.machine.transition(|state| match state {
            OfflineState::Offline | OfflineState::FailedToGoOnline => {
                Ok(OfflineState::GoingOnline)
            }
            other => Err(TransitionError::invalid("go_online", &other)),
        });

        let interactor = Arc::clone(&self.vehicle_interactor);
        let vehicle = self.context.vehicle_id();
        self.machine.async_transition(move |state| async move {
            match state {
                OfflineState::GoingOnline => {
                    match interactor.mark_vehicle_ready(&vehicle).await {
                        Ok(()) => Ok(OfflineState::Online),
                        Err(err) => {
                            warn!(error = %err, "failed to go online");
                            Ok(OfflineState::FailedToGoOnline)
                        }
                    }
                }
                // The paired guard above was rejected, so this leg must not
                // touch the service either.
                other => Err(TransitionError::invalid("go_online", &other)),
            }
        });
    }

    pub fn observe(&self) -> watch::Receiver<OfflineState> {
        self.machine.observe()
    }

    pub fn current(&self) -> OfflineState {
        self.machine.current()
    }
}
