//! Map projection seam. View-models that drive a map screen implement
//! `MapStateProvider`; the shell's map adapter (Google/HERE/Mapbox) consumes
//! the drawable values and owns all rendering.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::model::LatLng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSettings {
    /// Whether the map should keep recentering on the device location.
    pub center_on_device: bool,
    pub show_user_location: bool,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center_on_device: false,
            show_user_location: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CameraUpdate {
    /// Center on one point at a fixed zoom.
    Center { location: LatLng, zoom: f64 },
    /// Fit every listed point into the viewport.
    FitToBounds { points: Vec<LatLng> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerIcon {
    Pickup,
    Dropoff,
    Vehicle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawableMarker {
    pub position: LatLng,
    pub icon: MarkerIcon,
    /// Heading in degrees clockwise from north, for directional icons.
    pub heading: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawablePath {
    pub points: Vec<LatLng>,
    pub dashed: bool,
}

/// One interface, four projections: a conforming view-model feeds the map
/// layer everything it renders. Streams are replay-latest so a late-attaching
/// map adapter picks up the current picture immediately.
pub trait MapStateProvider {
    fn map_settings(&self) -> watch::Receiver<MapSettings>;

    fn camera_updates(&self) -> watch::Receiver<CameraUpdate>;

    /// Markers keyed by a stable identity so adapters can diff.
    fn markers(&self) -> watch::Receiver<HashMap<String, DrawableMarker>>;

    fn paths(&self) -> watch::Receiver<Vec<DrawablePath>>;
}
