//! Idle (online, no plan) screen: the driver takes the vehicle offline from
//! here. Mirror of the offline screen's go-online flow.

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
pub enum IdleState {
    Online,
    GoingOffline,
    Offline,
    FailedToGoOffline,
}

pub struct IdleViewModel {
    machine: StateMachine<IdleState>,
    context: Arc<SessionContext>,
    vehicle_interactor: Arc<dyn DriverVehicleInteractor>,
}

impl IdleViewModel {
    pub fn new(
        context: Arc<SessionContext>,
        vehicle_interactor: Arc<dyn DriverVehicleInteractor>,
    ) -> Self {
        Self {
            machine: StateMachine::new(IdleState::Online),
            context,
            vehicle_interactor,
        }
    }

    /// Marks the vehicle not ready. Same guarded-idempotence discipline as
    /// `OfflineViewModel::go_online`.
    #[instrument(skip(self), fields(vehicle = %self.context.vehicle_id()))]
    pub fn go_offline(&self) {
        self.machine.transition(|state| match state {
            IdleState::Online | IdleState::FailedToGoOffline => Ok(IdleState::GoingOffline),
            other => Err(TransitionError::invalid("go_offline", &other)),
        });

        let interactor = Arc::clone(&self.vehicle_interactor);
        let vehicle = self.context.vehicle_id();
        self.machine.async_transition(move |state| async move {
            match state {
                IdleState::GoingOffline => {
                    match interactor.mark_vehicle_not_ready(&vehicle).await {
                        Ok(()) => Ok(IdleState::Offline),
                        Err(err) => {
                            warn!(error = %err, "failed to go offline");
                            Ok(IdleState::FailedToGoOffline)
                        }
                    }
                }
                other => Err(TransitionError::invalid("go_offline", &other)),
            }
        });
    }

    pub fn observe(&self) -> watch::Receiver<IdleState> {
        self.machine.observe()
    }

    pub fn current(&self) -> IdleState {
        self.machine.current()
    }
}
