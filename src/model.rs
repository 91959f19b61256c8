use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(TripId);
typed_id!(PassengerId);
typed_id!(VehicleId);
typed_id!(StepId);
typed_id!(FleetId);

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid coordinate: lat={0}, lng={1}")]
    InvalidCoordinate(f64, f64),
    #[error("invalid rider count: {0}")]
    InvalidRiderCount(u32),
}

// --- Coordinate: validated, NaN-safe ---

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LatLng {
    lat: f64,
    lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite()
            || !lng.is_finite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lng)
        {
            return Err(ValidationError::InvalidCoordinate(lat, lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl PartialEq for LatLng {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lng.to_bits() == other.lng.to_bits()
    }
}

impl Eq for LatLng {}

/// Rider headcount for a pickup/dropoff (1-8 per vehicle capacity rules).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RiderCount(u32);

impl RiderCount {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 8;

    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::InvalidRiderCount(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// A coordinate plus its reverse-geocoded display name. When geocoding is
/// unavailable the display name degrades to rendered coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub location: LatLng,
    pub display_name: String,
}

impl NamedLocation {
    pub fn new(location: LatLng, display_name: impl Into<String>) -> Self {
        Self {
            location,
            display_name: display_name.into(),
        }
    }

    pub fn unnamed(location: LatLng) -> Self {
        Self {
            display_name: format!("{:.5}, {:.5}", location.lat(), location.lng()),
            location,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripLocations {
    pub pickup: NamedLocation,
    pub dropoff: NamedLocation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub license_plate: String,
    pub contact_phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub polyline: Vec<LatLng>,
    pub travel_time_ms: u64,
    pub distance_meters: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Unregistered,
    Ready,
    NotReady,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistration {
    pub license_plate: String,
    pub rider_capacity: RiderCount,
}

/// Fleet selected for the current session after fleet-option resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFleet {
    pub fleet_id: FleetId,
}

/// Per-session context constructed once by the shell at startup and handed
/// to every view-model. There is no ambient global state in this core.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub user_id: String,
    pub fleet: ResolvedFleet,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, fleet: ResolvedFleet) -> Arc<Self> {
        Arc::new(Self {
            user_id: user_id.into(),
            fleet,
        })
    }

    pub fn passenger_id(&self) -> PassengerId {
        PassengerId::new(self.user_id.clone())
    }

    pub fn vehicle_id(&self) -> VehicleId {
        VehicleId::new(self.user_id.clone())
    }
}
