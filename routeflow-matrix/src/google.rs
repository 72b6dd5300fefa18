//! Google Distance Matrix API response types.
//!
//! Deserialisation types for the JSON envelope returned by the provider's
//! `distancematrix` endpoint. Distances arrive in metres and durations in
//! seconds; conversion to kilometres and minutes happens in the provider.
//!
//! See: <https://developers.google.com/maps/documentation/distance-matrix>

use serde::Deserialize;

/// Top-level Distance Matrix response.
#[derive(Debug, Deserialize)]
pub struct DistanceMatrixResponse {
    /// Request-level status; `"OK"` on success. Other values include
    /// `"OVER_QUERY_LIMIT"`, `"REQUEST_DENIED"`, and
    /// `"INVALID_REQUEST"`.
    pub status: String,
    /// Human-readable detail when `status` is not `"OK"`.
    #[serde(default)]
    pub error_message: Option<String>,
    /// One row per origin, in request order.
    #[serde(default)]
    pub rows: Vec<DistanceMatrixRow>,
}

/// One origin's results.
#[derive(Debug, Deserialize)]
pub struct DistanceMatrixRow {
    /// One element per destination, in request order.
    #[serde(default)]
    pub elements: Vec<DistanceMatrixElement>,
}

/// One origin-destination result.
#[derive(Debug, Deserialize)]
pub struct DistanceMatrixElement {
    /// Element-level status; `"OK"` when the pair is routable. Values
    /// such as `"ZERO_RESULTS"` leave `distance` and `duration` absent.
    pub status: String,
    /// Travel distance in metres.
    #[serde(default)]
    pub distance: Option<MetricValue>,
    /// Travel duration in seconds.
    #[serde(default)]
    pub duration: Option<MetricValue>,
}

/// A numeric field with its display text elided.
#[derive(Debug, Deserialize)]
pub struct MetricValue {
    /// Raw value in the provider's base unit.
    pub value: f64,
}

impl DistanceMatrixResponse {
    /// Whether the request-level status indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

impl DistanceMatrixElement {
    /// Distance and duration when the pair is routable.
    #[must_use]
    pub fn values(&self) -> Option<(f64, f64)> {
        if self.status != "OK" {
            return None;
        }
        match (&self.distance, &self.duration) {
            (Some(distance), Some(duration)) => Some((distance.value, duration.value)),
            _ => None,
        }
    }
}
