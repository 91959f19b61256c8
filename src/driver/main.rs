//! Top-level driver screen: resolves the vehicle's status once via polling,
//! then tracks online/offline movement reported by the child screens.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::instrument;

use crate::error::TransitionError;
use crate::interactors::DriverVehicleInteractor;
use crate::model::{SessionContext, VehicleStatus};
use crate::poll::{poll_distinct, PollHandle};
use crate::state_machine::StateMachine;
use crate::STATUS_POLL_INTERVAL;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverMainState {
    Unknown,
    VehicleUnregistered,
    Offline,
    Online,
}

pub struct DriverMainViewModel {
    machine: Arc<StateMachine<DriverMainState>>,
    _status_poll: PollHandle,
}

impl DriverMainViewModel {
    pub fn new(
        context: Arc<SessionContext>,
        vehicle_interactor: Arc<dyn DriverVehicleInteractor>,
    ) -> Self {
        let machine = Arc::new(StateMachine::new(DriverMainState::Unknown));

        // Status polling only resolves the initial Unknown; once resolved,
        // the child screens drive movement through the explicit events below
        // and the guard rejects further poll results.
        let sink_machine = Arc::clone(&machine);
        let status_poll = poll_distinct(
            STATUS_POLL_INTERVAL,
            move || {
                let interactor = Arc::clone(&vehicle_interactor);
                let vehicle = context.vehicle_id();
                async move { interactor.vehicle_status(&vehicle).await.map(Some) }
            },
            move |status: VehicleStatus| {
                sink_machine.transition(move |state| match state {
                    DriverMainState::Unknown => Ok(match status {
                        VehicleStatus::Unregistered => DriverMainState::VehicleUnregistered,
                        VehicleStatus::Ready => DriverMainState::Online,
                        VehicleStatus::NotReady => DriverMainState::Offline,
                    }),
                    other => Err(TransitionError::invalid("resolve_vehicle_status", &other)),
                });
            },
        );

        Self {
            machine,
            _status_poll: status_poll,
        }
    }

    #[instrument(skip(self))]
    pub fn went_online(&self) {
        self.machine.transition(|state| match state {
            DriverMainState::Offline => Ok(DriverMainState::Online),
            other => Err(TransitionError::invalid("went_online", &other)),
        });
    }

    #[instrument(skip(self))]
    pub fn went_offline(&self) {
        self.machine.transition(|state| match state {
            DriverMainState::Online => Ok(DriverMainState::Offline),
            other => Err(TransitionError::invalid("went_offline", &other)),
        });
    }

    #[instrument(skip(self))]
    pub fn registration_finished(&self) {
        self.machine.transition(|state| match state {
            DriverMainState::VehicleUnregistered => Ok(DriverMainState::Offline),
            other => Err(TransitionError::invalid("registration_finished", &other)),
        });
    }

    pub fn observe(&self) -> watch::Receiver<DriverMainState> {
        self.machine.observe()
    }

    pub fn current(&self) -> DriverMainState {
        self.machine.current()
    }
}
