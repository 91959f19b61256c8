//! Vehicle registration screen, shown until the vehicle exists on the
//! service side. Completion is reported to the owner through
//! `RegistrationListener`; the screen itself has no post-registration state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{instrument, warn};

use crate::driver::RegistrationListener;
use crate::error::TransitionError;
use crate::interactors::DriverVehicleInteractor;
use crate::model::{SessionContext, VehicleRegistration};
use crate::state_machine::StateMachine;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    PreRegistration,
    Registering,
}

pub struct VehicleUnregisteredViewModel {
    machine: StateMachine<RegistrationState>,
    context: Arc<SessionContext>,
    vehicle_interactor: Arc<dyn DriverVehicleInteractor>,
    listener: Arc<dyn RegistrationListener>,
}

impl VehicleUnregisteredViewModel {
    pub fn new(
        context: Arc<SessionContext>,
        vehicle_interactor: Arc<dyn DriverVehicleInteractor>,
        listener: Arc<dyn RegistrationListener>,
    ) -> Self {
        Self {
            machine: StateMachine::new(RegistrationState::PreRegistration),
            context,
            vehicle_interactor,
            listener,
        }
    }

    /// Submits the registration form. On success the listener fires and the
    /// owner is expected to dismiss this screen; on failure the form becomes
    /// editable again.
    #[instrument(skip(self, registration), fields(vehicle = %self.context.vehicle_id()))]
    pub fn register(&self, registration: VehicleRegistration) {
        // Registration stays in `Registering` after success (the owner
        // dismisses the screen), so the service leg cannot tell "my guard
        // committed" apart from "an earlier registration finished" by state
        // alone. The accepted flag ties the two legs of this call together.
        let accepted = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = Arc::clone(&accepted);
        self.machine.transition(move |state| match state {
            RegistrationState::PreRegistration => {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(RegistrationState::Registering)
            }
            other => Err(TransitionError::invalid("register", &other)),
        });

        let interactor = Arc::clone(&self.vehicle_interactor);
        let listener = Arc::clone(&self.listener);
        let vehicle = self.context.vehicle_id();
        self.machine.async_transition(move |state| async move {
            if !accepted.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(TransitionError::invalid("register", &state));
            }
            match state {
                RegistrationState::Registering => {
                    match interactor.register_vehicle(&vehicle, &registration).await {
                        Ok(()) => {
                            listener.registration_finished();
                            Ok(RegistrationState::Registering)
                        }
                        Err(err) => {
                            warn!(error = %err, "vehicle registration failed");
                            Ok(RegistrationState::PreRegistration)
                        }
                    }
                }
                other => Err(TransitionError::invalid("register", &other)),
            }
        });
    }

    pub fn observe(&self) -> watch::Receiver<RegistrationState> {
        self.machine.observe()
    }

    pub fn current(&self) -> RegistrationState {
        self.machine.current()
    }
}
