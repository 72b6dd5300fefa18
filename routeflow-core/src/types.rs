//! Request entities: locations, vehicles, and deliveries.
//!
//! These models carry basic validation to keep downstream components
//! honest. Constructors return `Result` to surface invalid input early;
//! optional attributes use `with_*` builders.

use std::collections::BTreeSet;

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A geographic point a route may visit.
///
/// Coordinates are decimal degrees (WGS84). Time windows and service time
/// are minutes from the request's implicit epoch.
///
/// # Examples
///
/// ```
/// use routeflow_core::Location;
///
/// # fn main() -> Result<(), routeflow_core::LocationError> {
/// let depot = Location::new("depot", 52.52, 13.405)?.as_depot();
/// assert!(depot.is_depot);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Identifier, unique within a request.
    pub id: String,
    /// Latitude in decimal degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in decimal degrees, `[-180, 180]`.
    pub longitude: f64,
    /// Whether vehicles start from and return to this location.
    #[serde(default)]
    pub is_depot: bool,
    /// Earliest acceptable arrival, minutes from the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window_start: Option<f64>,
    /// Latest acceptable arrival, minutes from the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window_end: Option<f64>,
    /// Minutes spent serving this stop; a default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_time: Option<f64>,
}

/// Errors returned by [`Location::new`] and its builders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// Latitude was outside `[-90, 90]` or not finite.
    #[error("location {id}: latitude {latitude} out of range")]
    InvalidLatitude { id: String, latitude: f64 },
    /// Longitude was outside `[-180, 180]` or not finite.
    #[error("location {id}: longitude {longitude} out of range")]
    InvalidLongitude { id: String, longitude: f64 },
    /// The time window closed before it opened.
    #[error("location {id}: time window start {start} exceeds end {end}")]
    InvalidTimeWindow { id: String, start: f64, end: f64 },
}

impl Location {
    /// Validates coordinates and constructs a [`Location`].
    pub fn new(
        id: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, LocationError> {
        let id = id.into();
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::InvalidLatitude { id, latitude });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidLongitude { id, longitude });
        }
        Ok(Self {
            id,
            latitude,
            longitude,
            is_depot: false,
            time_window_start: None,
            time_window_end: None,
            service_time: None,
        })
    }

    /// Marks this location as a depot.
    #[must_use]
    pub fn as_depot(mut self) -> Self {
        self.is_depot = true;
        self
    }

    /// Attaches an arrival time window, validating `start <= end`.
    pub fn with_time_window(mut self, start: f64, end: f64) -> Result<Self, LocationError> {
        if start > end {
            return Err(LocationError::InvalidTimeWindow {
                id: self.id,
                start,
                end,
            });
        }
        self.time_window_start = Some(start);
        self.time_window_end = Some(end);
        Ok(self)
    }

    /// Sets the minutes spent serving this stop.
    #[must_use]
    pub fn with_service_time(mut self, minutes: f64) -> Self {
        self.service_time = Some(minutes);
        self
    }

    /// Position as a `geo` coordinate (`x` = longitude, `y` = latitude).
    #[must_use]
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }

    /// Time window as a pair, when both ends are present.
    #[must_use]
    pub fn time_window(&self) -> Option<(f64, f64)> {
        match (self.time_window_start, self.time_window_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// A routable resource with capacity and cost attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Identifier, unique within a request.
    pub id: String,
    /// Carrying capacity in integer demand units.
    pub capacity: u32,
    /// Location the vehicle departs from.
    pub start_location_id: String,
    /// Location the vehicle must finish at; defaults to its start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_location_id: Option<String>,
    /// Cost charged per kilometre travelled.
    #[serde(default = "default_cost_per_distance_unit")]
    pub cost_per_distance_unit: f64,
    /// Cost charged once if the vehicle is used at all.
    #[serde(default)]
    pub fixed_cost: f64,
    /// Hard bound on total route length in kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    /// Hard bound on non-depot stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stops: Option<usize>,
    /// Whether the vehicle may be dispatched.
    #[serde(default = "default_available")]
    pub available: bool,
    /// Capabilities this vehicle offers.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skills: BTreeSet<String>,
}

fn default_cost_per_distance_unit() -> f64 {
    1.0
}

fn default_available() -> bool {
    true
}

/// Errors returned by [`Vehicle::new`] and its builders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VehicleError {
    /// A cost attribute was negative or not finite.
    #[error("vehicle {id}: cost {value} must be finite and non-negative")]
    InvalidCost { id: String, value: f64 },
    /// The distance bound was non-positive or not finite.
    #[error("vehicle {id}: max distance {value} must be finite and positive")]
    InvalidMaxDistance { id: String, value: f64 },
}

impl Vehicle {
    /// Constructs a vehicle starting (and by default ending) at
    /// `start_location_id`.
    pub fn new(id: impl Into<String>, capacity: u32, start_location_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capacity,
            start_location_id: start_location_id.into(),
            end_location_id: None,
            cost_per_distance_unit: default_cost_per_distance_unit(),
            fixed_cost: 0.0,
            max_distance: None,
            max_stops: None,
            available: true,
            skills: BTreeSet::new(),
        }
    }

    /// Sets a distinct end location.
    #[must_use]
    pub fn with_end_location(mut self, end_location_id: impl Into<String>) -> Self {
        self.end_location_id = Some(end_location_id.into());
        self
    }

    /// Sets the per-kilometre and fixed costs, validating both.
    pub fn with_costs(mut self, per_distance: f64, fixed: f64) -> Result<Self, VehicleError> {
        for value in [per_distance, fixed] {
            if !value.is_finite() || value < 0.0 {
                return Err(VehicleError::InvalidCost { id: self.id, value });
            }
        }
        self.cost_per_distance_unit = per_distance;
        self.fixed_cost = fixed;
        Ok(self)
    }

    /// Bounds the total route length in kilometres.
    pub fn with_max_distance(mut self, kilometres: f64) -> Result<Self, VehicleError> {
        if !kilometres.is_finite() || kilometres <= 0.0 {
            return Err(VehicleError::InvalidMaxDistance {
                id: self.id,
                value: kilometres,
            });
        }
        self.max_distance = Some(kilometres);
        Ok(self)
    }

    /// Bounds the number of non-depot stops.
    #[must_use]
    pub fn with_max_stops(mut self, stops: usize) -> Self {
        self.max_stops = Some(stops);
        self
    }

    /// Marks the vehicle as unavailable for dispatch.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Adds a capability to the vehicle's skill set.
    #[must_use]
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    /// The location this vehicle must finish at.
    #[must_use]
    pub fn end_location(&self) -> &str {
        self.end_location_id
            .as_deref()
            .unwrap_or(&self.start_location_id)
    }
}

/// A unit of work bound to a non-depot location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Identifier, unique within a request.
    pub id: String,
    /// Location where the delivery (or pickup) takes place.
    pub location_id: String,
    /// Demand in integer units; consumes capacity unless `is_pickup`.
    pub demand: u32,
    /// Relative importance; higher values are dropped last.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Capabilities the serving vehicle must offer.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_skills: BTreeSet<String>,
    /// Pickups free capacity instead of consuming it.
    #[serde(default)]
    pub is_pickup: bool,
}

fn default_priority() -> u32 {
    1
}

impl Delivery {
    /// Constructs a delivery of `demand` units at `location_id`.
    pub fn new(
        id: impl Into<String>,
        location_id: impl Into<String>,
        demand: u32,
    ) -> Self {
        Self {
            id: id.into(),
            location_id: location_id.into(),
            demand,
            priority: default_priority(),
            required_skills: BTreeSet::new(),
            is_pickup: false,
        }
    }

    /// Sets the drop-resistance priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Requires a capability of the serving vehicle.
    #[must_use]
    pub fn requiring_skill(mut self, skill: impl Into<String>) -> Self {
        self.required_skills.insert(skill.into());
        self
    }

    /// Marks this as a pickup (negative demand contribution).
    #[must_use]
    pub fn as_pickup(mut self) -> Self {
        self.is_pickup = true;
        self
    }

    /// Demand as a signed quantity: pickups free capacity.
    #[must_use]
    pub fn signed_demand(&self) -> i64 {
        let demand = i64::from(self.demand);
        if self.is_pickup { -demand } else { demand }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(90.0, 0.0)]
    #[case(-90.0, 180.0)]
    #[case(0.0, -180.0)]
    fn location_accepts_boundary_coordinates(#[case] lat: f64, #[case] lon: f64) {
        assert!(Location::new("a", lat, lon).is_ok());
    }

    #[rstest]
    #[case(90.1, 0.0)]
    #[case(f64::NAN, 0.0)]
    fn location_rejects_bad_latitude(#[case] lat: f64, #[case] lon: f64) {
        let err = Location::new("a", lat, lon).unwrap_err();
        assert!(matches!(err, LocationError::InvalidLatitude { .. }));
    }

    #[rstest]
    #[case(0.0, 180.5)]
    #[case(0.0, f64::INFINITY)]
    fn location_rejects_bad_longitude(#[case] lat: f64, #[case] lon: f64) {
        let err = Location::new("a", lat, lon).unwrap_err();
        assert!(matches!(err, LocationError::InvalidLongitude { .. }));
    }

    #[rstest]
    fn location_rejects_inverted_time_window() {
        let result = Location::new("a", 0.0, 0.0).unwrap().with_time_window(120.0, 60.0);
        assert!(matches!(
            result,
            Err(LocationError::InvalidTimeWindow { .. })
        ));
    }

    #[rstest]
    fn vehicle_end_location_defaults_to_start() {
        let vehicle = Vehicle::new("v1", 10, "depot");
        assert_eq!(vehicle.end_location(), "depot");

        let vehicle = vehicle.with_end_location("yard");
        assert_eq!(vehicle.end_location(), "yard");
    }

    #[rstest]
    fn vehicle_rejects_negative_cost() {
        let result = Vehicle::new("v1", 10, "depot").with_costs(-1.0, 0.0);
        assert!(matches!(result, Err(VehicleError::InvalidCost { .. })));
    }

    #[rstest]
    fn pickup_demand_is_negative() {
        let delivery = Delivery::new("d1", "a", 4).as_pickup();
        assert_eq!(delivery.signed_demand(), -4);
        assert_eq!(Delivery::new("d2", "a", 4).signed_demand(), 4);
    }

    #[rstest]
    fn serde_round_trips_a_location() {
        let location = Location::new("a", 1.5, 2.5)
            .unwrap()
            .as_depot()
            .with_service_time(10.0);
        let json = serde_json::to_string(&location).unwrap();
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, location);
    }
}
