//! Route statistics aggregation.

use std::collections::BTreeSet;
use std::time::Duration;

use routeflow_core::{Delivery, Location, Solution, Vehicle, VehicleCost};

/// Computes per-vehicle costs and solution-wide totals from the detailed
/// routes, writing them into `solution.statistics`, `total_cost`, and
/// `total_distance`.
///
/// Everything is recomputed from the segments, so repeated application
/// with the same arguments yields identical values.
pub fn add_statistics(
    solution: &mut Solution,
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    computation_time: Option<Duration>,
) {
    let depot_ids: BTreeSet<&str> = locations
        .iter()
        .filter(|location| location.is_depot)
        .map(|location| location.id.as_str())
        .collect();

    let mut total_cost = 0.0;
    let mut total_distance = 0.0;
    let mut vehicle_costs = std::collections::BTreeMap::new();
    for (vehicle_id, &route_index) in &solution.assigned_vehicles {
        let Some(vehicle) = vehicles.iter().find(|vehicle| &vehicle.id == vehicle_id) else {
            log::warn!("assigned vehicle {vehicle_id} is not in the request");
            continue;
        };
        let Some(route) = solution.detailed_routes.get(route_index) else {
            continue;
        };
        let distance: f64 = route.segments.iter().map(|segment| segment.distance).sum();
        let stops: BTreeSet<&str> = route
            .stops
            .iter()
            .map(String::as_str)
            .filter(|stop| !depot_ids.contains(stop))
            .collect();
        let cost = vehicle.fixed_cost + distance * vehicle.cost_per_distance_unit;
        total_cost += cost;
        total_distance += distance;
        vehicle_costs.insert(
            vehicle_id.clone(),
            VehicleCost {
                distance,
                cost,
                stops: stops.len(),
            },
        );
    }

    solution.total_cost = total_cost;
    if !solution.detailed_routes.is_empty() {
        solution.total_distance = total_distance;
    }

    let statistics = &mut solution.statistics;
    statistics.vehicle_costs = vehicle_costs;
    statistics.total_stops = solution
        .detailed_routes
        .iter()
        .map(|route| route.stops.len())
        .sum();
    statistics.vehicles_used = solution.assigned_vehicles.len();
    statistics.vehicles_unused = vehicles
        .len()
        .saturating_sub(solution.assigned_vehicles.len());
    statistics.deliveries_assigned = deliveries
        .len()
        .saturating_sub(solution.unassigned_deliveries.len());
    statistics.avg_distance_per_stop = if statistics.total_stops > 0 {
        Some(solution.total_distance / statistics.total_stops as f64)
    } else {
        None
    };
    statistics.average_capacity_utilization = if solution.detailed_routes.is_empty() {
        None
    } else {
        let sum: f64 = solution
            .detailed_routes
            .iter()
            .map(|route| route.capacity_utilization)
            .sum();
        Some(sum / solution.detailed_routes.len() as f64)
    };
    if let Some(elapsed) = computation_time {
        statistics.computation_time_ms = Some(elapsed.as_millis() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeflow_core::test_support::{customer, delivery, depot, vehicle};
    use routeflow_core::{DetailedRoute, RouteSegment};
    use rstest::rstest;

    fn annotated_solution() -> Solution {
        let mut solution = Solution::success();
        solution.routes = vec![vec!["d".into(), "a".into(), "d".into()]];
        solution.assigned_vehicles.insert("v1".into(), 0);
        solution.detailed_routes.push(DetailedRoute {
            vehicle_id: "v1".into(),
            stops: vec!["d".into(), "a".into(), "d".into()],
            segments: vec![
                RouteSegment {
                    from: "d".into(),
                    to: "a".into(),
                    path: vec!["d".into(), "a".into()],
                    distance: 10.0,
                    time: None,
                },
                RouteSegment {
                    from: "a".into(),
                    to: "d".into(),
                    path: vec!["a".into(), "d".into()],
                    distance: 10.0,
                    time: None,
                },
            ],
            total_distance: 20.0,
            total_time: 0.0,
            capacity_utilization: 0.5,
            estimated_arrival_times: Vec::new(),
        });
        solution
    }

    #[rstest]
    fn computes_costs_and_totals() {
        let mut solution = annotated_solution();
        let locations = vec![depot("d", 0.0, 0.0), customer("a", 0.0, 1.0)];
        let vehicles = vec![
            vehicle("v1", 10, "d").with_costs(2.0, 5.0).unwrap(),
            vehicle("idle", 10, "d"),
        ];
        let deliveries = vec![delivery("p1", "a", 5)];

        add_statistics(&mut solution, &locations, &vehicles, &deliveries, None);

        assert_eq!(solution.total_cost, 45.0);
        assert_eq!(solution.total_distance, 20.0);
        let cost = &solution.statistics.vehicle_costs["v1"];
        assert_eq!(cost.distance, 20.0);
        assert_eq!(cost.stops, 1);
        assert_eq!(solution.statistics.vehicles_used, 1);
        assert_eq!(solution.statistics.vehicles_unused, 1);
        assert_eq!(solution.statistics.deliveries_assigned, 1);
        assert_eq!(solution.statistics.total_stops, 3);
    }

    #[rstest]
    fn repeated_application_is_idempotent() {
        let mut solution = annotated_solution();
        let locations = vec![depot("d", 0.0, 0.0), customer("a", 0.0, 1.0)];
        let vehicles = vec![vehicle("v1", 10, "d").with_costs(2.0, 5.0).unwrap()];
        let deliveries = vec![delivery("p1", "a", 5)];

        add_statistics(&mut solution, &locations, &vehicles, &deliveries, None);
        let first = solution.clone();
        add_statistics(&mut solution, &locations, &vehicles, &deliveries, None);

        assert_eq!(solution, first);
    }

    #[rstest]
    fn empty_solution_yields_zero_totals() {
        let mut solution = Solution::success();
        add_statistics(&mut solution, &[], &[], &[], None);

        assert_eq!(solution.total_cost, 0.0);
        assert_eq!(solution.statistics.total_stops, 0);
        assert_eq!(solution.statistics.avg_distance_per_stop, None);
    }
}
