//! Property-based tests for the VRP solver.
//!
//! These assert invariants that must hold for all valid solver inputs,
//! complementing the scenario tests in the crate.
//!
//! # Invariants tested
//!
//! - **Partition:** every delivery appears on exactly one side of the
//!   routes/unassigned split.
//! - **Capacity:** the demand served by a vehicle never exceeds its
//!   capacity.
//! - **Endpoints:** every route starts and ends at the vehicle's
//!   declared locations.

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;
use routeflow_core::test_support::{customer, delivery, depot, vehicle};
use routeflow_core::{
    Delivery, Location, SolutionStatus, SolverInput, SquareMatrix, Vehicle, VrpSolve,
};
use routeflow_solver::CpVrpSolver;

/// Customers on a ring around the depot with the given demands.
fn build_problem(demands: &[u32]) -> (Vec<Location>, Vec<Delivery>, SquareMatrix) {
    let mut locations = vec![depot("depot", 0.0, 0.0)];
    let mut deliveries = Vec::new();
    for (index, &demand) in demands.iter().enumerate() {
        let id = format!("c{index}");
        locations.push(customer(&id, 0.0, 0.1 + index as f64 * 0.1));
        deliveries.push(delivery(&format!("p{index}"), &id, demand));
    }
    let size = locations.len();
    let mut matrix = SquareMatrix::zeros(size);
    for row in 0..size {
        for col in 0..size {
            if row != col {
                matrix.set(row, col, 1.0 + (row + col) as f64);
            }
        }
    }
    (locations, deliveries, matrix)
}

fn solve(
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    matrix: &SquareMatrix,
) -> routeflow_core::Solution {
    CpVrpSolver::new().solve(&SolverInput {
        distance: matrix,
        time: None,
        locations,
        vehicles,
        deliveries,
        depot_index: 0,
        time_limit: Duration::ZERO,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every delivery ID lands in exactly one of the routes (via its
    /// location) or the unassigned list.
    #[test]
    fn deliveries_partition_between_routes_and_unassigned(
        demands in proptest::collection::vec(0_u32..8, 1..6),
        capacity in 1_u32..12,
    ) {
        let (locations, deliveries, matrix) = build_problem(&demands);
        let vehicles = vec![vehicle("v1", capacity, "depot")];

        let solution = solve(&locations, &vehicles, &deliveries, &matrix);

        let location_of: HashMap<&str, &str> = deliveries
            .iter()
            .map(|delivery| (delivery.id.as_str(), delivery.location_id.as_str()))
            .collect();
        for delivery in &deliveries {
            let routed = solution
                .routes
                .iter()
                .flatten()
                .any(|stop| stop == location_of[delivery.id.as_str()]);
            let unassigned = solution
                .unassigned_deliveries
                .iter()
                .any(|id| id == &delivery.id);
            prop_assert!(
                routed ^ unassigned,
                "{} must be routed or unassigned, not both",
                delivery.id
            );
        }
    }

    /// Demand served on a route never exceeds the vehicle's capacity.
    #[test]
    fn served_demand_respects_capacity(
        demands in proptest::collection::vec(1_u32..8, 1..6),
        capacity in 1_u32..12,
    ) {
        let (locations, deliveries, matrix) = build_problem(&demands);
        let vehicles = vec![vehicle("v1", capacity, "depot")];

        let solution = solve(&locations, &vehicles, &deliveries, &matrix);

        for route in &solution.routes {
            let served: u32 = deliveries
                .iter()
                .filter(|delivery| route.iter().any(|stop| stop == &delivery.location_id))
                .map(|delivery| delivery.demand)
                .sum();
            prop_assert!(
                served <= capacity,
                "served {served} exceeds capacity {capacity}"
            );
        }
    }

    /// Routes begin and end at the vehicle's declared locations.
    #[test]
    fn routes_are_anchored_at_vehicle_endpoints(
        demands in proptest::collection::vec(1_u32..4, 1..5),
    ) {
        let (locations, deliveries, matrix) = build_problem(&demands);
        let vehicles = vec![vehicle("v1", 40, "depot")];

        let solution = solve(&locations, &vehicles, &deliveries, &matrix);

        prop_assert_eq!(solution.status, SolutionStatus::Success);
        for route in &solution.routes {
            prop_assert_eq!(route.first().map(String::as_str), Some("depot"));
            prop_assert_eq!(route.last().map(String::as_str), Some("depot"));
        }
    }
}
