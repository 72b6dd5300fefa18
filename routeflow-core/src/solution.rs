//! Solution DTOs produced by a solve.
//!
//! A [`Solution`] always carries a status; solver and provider failures
//! fold into the DTO rather than surfacing as errors, so callers branch on
//! [`SolutionStatus`] and read the diagnostics out of
//! [`Statistics::error`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// A dispatch satisfying all constraints was found.
    Success,
    /// The model admitted no dispatch, even after dropping deliveries.
    NoSolution,
    /// A pipeline stage failed; see `statistics.error`.
    Error,
}

/// One leg of a detailed route between consecutive stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Stop the leg departs from.
    pub from: String,
    /// Stop the leg arrives at.
    pub to: String,
    /// Expanded node sequence, endpoints inclusive.
    pub path: Vec<String>,
    /// Length of the leg in kilometres.
    pub distance: f64,
    /// Travel time in minutes, when a time matrix was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// Per-vehicle expansion of a solver route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedRoute {
    /// Vehicle serving this route.
    pub vehicle_id: String,
    /// Ordered stops including depot endpoints.
    pub stops: Vec<String>,
    /// Shortest-path expansion of each consecutive stop pair.
    pub segments: Vec<RouteSegment>,
    /// Sum of segment distances in kilometres.
    pub total_distance: f64,
    /// Sum of segment times in minutes.
    pub total_time: f64,
    /// Demand served divided by vehicle capacity.
    pub capacity_utilization: f64,
    /// Arrival minute at each stop, aligned with `stops`; empty unless the
    /// solve considered time windows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub estimated_arrival_times: Vec<f64>,
}

/// Cost breakdown for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCost {
    /// Distance travelled in kilometres.
    pub distance: f64,
    /// `fixed_cost + distance * cost_per_distance_unit`.
    pub cost: f64,
    /// Unique non-depot stops visited.
    pub stops: usize,
}

/// Why a reroute was requested, recorded in [`ReroutingInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerouteReason {
    /// Traffic factors changed segment costs.
    Traffic,
    /// Service at some locations is delayed.
    ServiceDelay,
    /// Segments became impassable.
    Roadblock,
}

/// Summary of a rerouting operation, attached to the new solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReroutingInfo {
    /// Event that triggered the reroute.
    pub reason: RerouteReason,
    /// Total distance of the plan being replaced.
    pub original_total_distance: f64,
    /// Total distance of the replacement plan.
    pub new_total_distance: f64,
    /// Deliveries already completed when the reroute ran.
    pub completed_delivery_count: usize,
    /// Deliveries carried into the new plan.
    pub rerouted_delivery_count: usize,
    /// Number of traffic factors applied (traffic reroutes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_factor_count: Option<usize>,
    /// Extra service minutes added (delay reroutes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<f64>,
    /// Locations whose service was delayed (delay reroutes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delayed_location_ids: Vec<String>,
    /// Blocked `(from, to)` pairs (roadblock reroutes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_segments: Vec<(String, String)>,
}

/// Aggregate figures written by the statistics pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    /// Stops across all detailed routes, depot endpoints included.
    pub total_stops: usize,
    /// Vehicles with at least one route.
    pub vehicles_used: usize,
    /// Vehicles left idle.
    pub vehicles_unused: usize,
    /// Deliveries placed on a route.
    pub deliveries_assigned: usize,
    /// `total_distance / total_stops`, when any stops exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_distance_per_stop: Option<f64>,
    /// Mean capacity utilization over used vehicles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_capacity_utilization: Option<f64>,
    /// Wall-clock duration of the solve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computation_time_ms: Option<u64>,
    /// Per-vehicle cost breakdown.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vehicle_costs: BTreeMap<String, VehicleCost>,
    /// Present when the solution came from a reroute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerouting_info: Option<ReroutingInfo>,
    /// Diagnostic message when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a solve: routes, assignment, expansion, and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Outcome of the solve.
    pub status: SolutionStatus,
    /// Ordered location-ID sequences, one per used vehicle.
    #[serde(default)]
    pub routes: Vec<Vec<String>>,
    /// Sum of route distances in kilometres.
    #[serde(default)]
    pub total_distance: f64,
    /// Sum of per-vehicle route costs.
    #[serde(default)]
    pub total_cost: f64,
    /// Vehicle ID to index into `routes`.
    #[serde(default)]
    pub assigned_vehicles: BTreeMap<String, usize>,
    /// Deliveries no route serves.
    #[serde(default)]
    pub unassigned_deliveries: Vec<String>,
    /// Segment-level expansion of each route.
    #[serde(default)]
    pub detailed_routes: Vec<DetailedRoute>,
    /// Aggregates and diagnostics.
    #[serde(default)]
    pub statistics: Statistics,
}

impl Solution {
    /// An empty success shell to be filled by the pipeline.
    #[must_use]
    pub fn success() -> Self {
        Self::with_status(SolutionStatus::Success)
    }

    /// A `no_solution` result carrying every delivery as unassigned.
    #[must_use]
    pub fn no_solution(unassigned_deliveries: Vec<String>) -> Self {
        let mut solution = Self::with_status(SolutionStatus::NoSolution);
        solution.unassigned_deliveries = unassigned_deliveries;
        solution
    }

    /// An `error` result with a diagnostic in `statistics.error`.
    #[must_use]
    pub fn error(message: impl Into<String>, unassigned_deliveries: Vec<String>) -> Self {
        let mut solution = Self::with_status(SolutionStatus::Error);
        solution.unassigned_deliveries = unassigned_deliveries;
        solution.statistics.error = Some(message.into());
        solution
    }

    fn with_status(status: SolutionStatus) -> Self {
        Self {
            status,
            routes: Vec::new(),
            total_distance: 0.0,
            total_cost: 0.0,
            assigned_vehicles: BTreeMap::new(),
            unassigned_deliveries: Vec::new(),
            detailed_routes: Vec::new(),
            statistics: Statistics::default(),
        }
    }

    /// Vehicle IDs with a route, in route order.
    #[must_use]
    pub fn assigned_vehicle_ids(&self) -> Vec<String> {
        let mut ids: Vec<(usize, &String)> = self
            .assigned_vehicles
            .iter()
            .map(|(id, &index)| (index, id))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Reconstructs a solution from a JSON object.
    pub fn from_object(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The solution as a JSON object.
    pub fn to_object(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> Solution {
        let mut solution = Solution::success();
        solution.routes = vec![vec!["depot".into(), "a".into(), "depot".into()]];
        solution.total_distance = 12.5;
        solution.assigned_vehicles.insert("v1".into(), 0);
        solution.detailed_routes.push(DetailedRoute {
            vehicle_id: "v1".into(),
            stops: vec!["depot".into(), "a".into(), "depot".into()],
            segments: vec![RouteSegment {
                from: "depot".into(),
                to: "a".into(),
                path: vec!["depot".into(), "a".into()],
                distance: 6.25,
                time: Some(7.5),
            }],
            total_distance: 12.5,
            total_time: 15.0,
            capacity_utilization: 0.5,
            estimated_arrival_times: Vec::new(),
        });
        solution
    }

    #[rstest]
    fn object_round_trip_preserves_equality() {
        let solution = sample();
        let object = solution.to_object().unwrap();
        let back = Solution::from_object(object).unwrap();
        assert_eq!(back, solution);
    }

    #[rstest]
    fn status_serialises_snake_case() {
        let json = serde_json::to_string(&SolutionStatus::NoSolution).unwrap();
        assert_eq!(json, "\"no_solution\"");
    }

    #[rstest]
    fn error_constructor_populates_diagnostics() {
        let solution = Solution::error("stage failed", vec!["d1".into()]);
        assert_eq!(solution.status, SolutionStatus::Error);
        assert_eq!(solution.statistics.error.as_deref(), Some("stage failed"));
        assert_eq!(solution.unassigned_deliveries, vec!["d1".to_owned()]);
    }

    #[rstest]
    fn assigned_vehicle_ids_follow_route_order() {
        let mut solution = Solution::success();
        solution.assigned_vehicles.insert("b".into(), 1);
        solution.assigned_vehicles.insert("a".into(), 0);
        assert_eq!(solution.assigned_vehicle_ids(), vec!["a", "b"]);
    }
}
