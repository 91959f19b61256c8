//! Driving screen: one waypoint's drive/navigate/arrive flow. The screen is
//! created per waypoint and reports completion through
//! `FinishedDrivingListener`; advancing the plan is the owner's job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use crate::driver::FinishedDrivingListener;
use crate::error::TransitionError;
use crate::interactors::{DeviceLocator, RouteInteractor};
use crate::model::{LatLng, RouteInfo};
use crate::state_machine::{derive, Derived, StateMachine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivingStep {
    DrivePending,
    Navigating,
    ConfirmingArrival,
}

/// What the driving screen renders: the lifecycle step plus the static
/// destination context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrivingDisplayState {
    pub step: DrivingStep,
    pub destination: LatLng,
}

pub struct DrivingViewModel {
    machine: StateMachine<DrivingStep>,
    display: Derived<DrivingDisplayState>,
    route: watch::Receiver<Option<RouteInfo>>,
    route_task: JoinHandle<()>,
    listener: Arc<dyn FinishedDrivingListener>,
}

impl DrivingViewModel {
    pub fn new(
        destination: LatLng,
        route_interactor: Arc<dyn RouteInteractor>,
        locator: Arc<dyn DeviceLocator>,
        listener: Arc<dyn FinishedDrivingListener>,
    ) -> Self {
        let machine = StateMachine::new(DrivingStep::DrivePending);
        let display = derive(machine.observe(), move |step| DrivingDisplayState {
            step: *step,
            destination,
        });

        // Route preview is best-effort decoration: the screen works without
        // it, so a failed lookup only logs.
        let (route_tx, route) = watch::channel(None);
        let route_task = tokio::spawn(async move {
            let origin = match locator.last_known_location().await {
                Ok(location) => location,
                Err(err) => {
                    warn!(error = %err, "no device location; skipping route preview");
                    return;
                }
            };
            match route_interactor.find_route(origin, destination).await {
                Ok(info) => {
                    let _ = route_tx.send(Some(info));
                }
                Err(err) => {
                    warn!(error = %err, "route lookup failed; no route preview");
                }
            }
        });

        Self {
            machine,
            display,
            route,
            route_task,
            listener,
        }
    }

    #[instrument(skip(self))]
    pub fn start_navigation(&self) {
        self.machine.transition(|state| match state {
            DrivingStep::DrivePending => Ok(DrivingStep::Navigating),
            other => Err(TransitionError::invalid("start_navigation", &other)),
        });
    }

    #[instrument(skip(self))]
    pub fn navigation_finished(&self) {
        self.machine.transition(|state| match state {
            DrivingStep::Navigating => Ok(DrivingStep::ConfirmingArrival),
            other => Err(TransitionError::invalid("navigation_finished", &other)),
        });
    }

    /// Terminal for this screen: fires the finished-driving listener and
    /// leaves the step unchanged. The owner tears the screen down in
    /// response, which is what bounds the callback to once.
    #[instrument(skip(self))]
    pub fn confirm_arrival(&self) {
        let listener = Arc::clone(&self.listener);
        self.machine.transition(move |state| match state {
            DrivingStep::ConfirmingArrival => {
                listener.finished_driving();
                Ok(DrivingStep::ConfirmingArrival)
            }
            other => Err(TransitionError::invalid("confirm_arrival", &other)),
        });
    }

    pub fn observe(&self) -> watch::Receiver<DrivingStep> {
        self.machine.observe()
    }

    pub fn observe_display(&self) -> watch::Receiver<DrivingDisplayState> {
        self.display.observe()
    }

    pub fn observe_route(&self) -> watch::Receiver<Option<RouteInfo>> {
        self.route.clone()
    }

    pub fn current(&self) -> DrivingStep {
        self.machine.current()
    }
}

impl Drop for DrivingViewModel {
    fn drop(&mut self) {
        self.route_task.abort();
    }
}
