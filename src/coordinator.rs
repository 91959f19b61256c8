//! Thin dispatch from committed view-model state to the visible screen.
//! The shells implement `ScreenPresenter`; everything else here is a pure
//! mapping plus a forwarding loop scoped to the screen's lifetime.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::driver::main::DriverMainState;
use crate::model::TripId;
use crate::rider::main::RiderMainState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderScreen {
    Start,
    LocationSearch,
    OnTrip { trip_id: TripId },
}

pub fn rider_screen_for(state: &RiderMainState) -> RiderScreen {
    match state {
        RiderMainState::StartScreen => RiderScreen::Start,
        RiderMainState::PreTrip => RiderScreen::LocationSearch,
        RiderMainState::OnTrip { trip_id } => RiderScreen::OnTrip {
            trip_id: trip_id.clone(),
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverScreen {
    /// Shown while the vehicle status is still unresolved.
    Launch,
    VehicleRegistration,
    Offline,
    Online,
}

pub fn driver_screen_for(state: &DriverMainState) -> DriverScreen {
    match state {
        DriverMainState::Unknown => DriverScreen::Launch,
        DriverMainState::VehicleUnregistered => DriverScreen::VehicleRegistration,
        DriverMainState::Offline => DriverScreen::Offline,
        DriverMainState::Online => DriverScreen::Online,
    }
}

/// Implemented by the shell; swaps the visible view controller.
pub trait ScreenPresenter<S>: Send + Sync {
    fn present(&self, screen: S);
}

/// Forwards state changes to the presenter until dropped. Consecutive states
/// mapping to the same screen are collapsed.
pub struct Coordinator {
    task: JoinHandle<()>,
}

impl Coordinator {
    pub fn attach<T, S, F>(
        mut states: watch::Receiver<T>,
        screen_for: F,
        presenter: Arc<dyn ScreenPresenter<S>>,
    ) -> Self
    where
        T: Clone + Send + Sync + 'static,
        S: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> S + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut shown = screen_for(&states.borrow_and_update());
            presenter.present(shown.clone());
            while states.changed().await.is_ok() {
                let next = screen_for(&states.borrow_and_update());
                if next != shown {
                    shown = next.clone();
                    presenter.present(next);
                }
            }
        });
        Self { task }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}
