//! Collapses the flat list of remote plan steps into driver-facing waypoints.
//!
//! The collapse is asymmetric on purpose: a drive followed by a matching
//! pickup yields two waypoints (the drive, then a separate load-riders stop),
//! while a drive followed by a matching dropoff yields a single merged
//! waypoint. The existing plan consumer depends on exactly this shape, so the
//! asymmetry must not be "fixed".

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PlanError;
use crate::model::{LatLng, RiderCount, StepId, TripId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    DriveToLocation,
    PickupRider,
    DropoffRider,
    /// Step kinds this client version does not understand. Logged and
    /// skipped so an old client survives a newer plan.
    Unrecognized(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: StepId,
    pub trip_id: TripId,
    pub action: StepAction,
    pub position: LatLng,
    pub rider_count: RiderCount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointAction {
    DriveToPickup,
    DriveToDropoff,
    LoadResource,
}

/// One stop in the vehicle plan. `step_ids` lists every remote step this
/// waypoint absorbs; they are acknowledged atomically when the waypoint
/// completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub task_id: TripId,
    pub step_ids: Vec<StepId>,
    pub action: WaypointAction,
    pub destination: LatLng,
    pub rider_count: RiderCount,
}

/// Single left-to-right scan with lookahead of one. A malformed sequence is
/// an invalid server response and fails the whole derivation; a partial plan
/// is never produced.
pub fn build_waypoints(steps: &[PlanStep]) -> Result<Vec<Waypoint>, PlanError> {
    let mut waypoints = Vec::with_capacity(steps.len());
    let mut index = 0;

    while index < steps.len() {
        let step = &steps[index];
        match &step.action {
            StepAction::DriveToLocation => {
                let next = steps.get(index + 1).ok_or_else(|| PlanError::DanglingDriveStep {
                    step_id: step.id.to_string(),
                })?;
                if next.trip_id != step.trip_id {
                    return Err(PlanError::TripMismatch {
                        step_id: step.id.to_string(),
                        expected_trip: step.trip_id.to_string(),
                        next_step_id: next.id.to_string(),
                        found_trip: next.trip_id.to_string(),
                    });
                }
                match &next.action {
                    StepAction::PickupRider => {
                        // The pickup itself stays in the scan; it becomes its
                        // own load-riders waypoint on the next iteration.
                        waypoints.push(Waypoint {
                            task_id: step.trip_id.clone(),
                            step_ids: vec![step.id.clone()],
                            action: WaypointAction::DriveToPickup,
                            destination: step.position,
                            rider_count: next.rider_count,
                        });
                        index += 1;
                    }
                    StepAction::DropoffRider => {
                        // Fully absorbed: there is no separate unload stop.
                        waypoints.push(Waypoint {
                            task_id: step.trip_id.clone(),
                            step_ids: vec![step.id.clone(), next.id.clone()],
                            action: WaypointAction::DriveToDropoff,
                            destination: step.position,
                            rider_count: next.rider_count,
                        });
                        index += 2;
                    }
                    StepAction::DriveToLocation | StepAction::Unrecognized(_) => {
                        return Err(PlanError::DanglingDriveStep {
                            step_id: step.id.to_string(),
                        });
                    }
                }
            }
            StepAction::PickupRider => {
                waypoints.push(Waypoint {
                    task_id: step.trip_id.clone(),
                    step_ids: vec![step.id.clone()],
                    action: WaypointAction::LoadResource,
                    destination: step.position,
                    rider_count: step.rider_count,
                });
                index += 1;
            }
            StepAction::DropoffRider => {
                // No preceding drive in this scan: the dropoff stands alone
                // as a self-contained drive-to-dropoff.
                waypoints.push(Waypoint {
                    task_id: step.trip_id.clone(),
                    step_ids: vec![step.id.clone()],
                    action: WaypointAction::DriveToDropoff,
                    destination: step.position,
                    rider_count: step.rider_count,
                });
                index += 1;
            }
            StepAction::Unrecognized(kind) => {
                warn!(step = %step.id, %kind, "skipping unrecognized plan step");
                index += 1;
            }
        }
    }

    Ok(waypoints)
}
