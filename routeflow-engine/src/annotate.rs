//! Shortest-path expansion of solver routes into detailed segments.

use std::collections::HashMap;

use routeflow_core::constants::MAX_SAFE_DISTANCE;
use routeflow_core::{
    Delivery, DetailedRoute, Graph, GraphError, PathFind, RouteSegment, Solution, SquareMatrix,
    Vehicle,
};

/// Expands every consecutive stop pair of every route into a
/// [`RouteSegment`] via shortest-path search over `graph`, and fills the
/// per-vehicle totals and capacity utilization.
///
/// An unreachable pair yields a placeholder segment at the distance
/// sentinel with the direct `[from, to]` path; it is logged, never fatal.
/// A negative edge weight is a modelling bug and fails the solve.
/// Arrival estimates already present on the solution (from a time-window
/// solve) are preserved.
pub fn annotate_solution(
    solution: &mut Solution,
    graph: &Graph,
    path_finder: &dyn PathFind,
    time: Option<&SquareMatrix>,
    location_index: &HashMap<String, usize>,
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
) -> Result<(), GraphError> {
    let vehicle_of: HashMap<&str, &Vehicle> = vehicles
        .iter()
        .map(|vehicle| (vehicle.id.as_str(), vehicle))
        .collect();
    let arrivals_of: HashMap<String, Vec<f64>> = solution
        .detailed_routes
        .iter()
        .map(|route| (route.vehicle_id.clone(), route.estimated_arrival_times.clone()))
        .collect();

    let mut detailed_routes: Vec<Option<DetailedRoute>> = vec![None; solution.routes.len()];
    for (vehicle_id, &route_index) in &solution.assigned_vehicles {
        let Some(stops) = solution.routes.get(route_index) else {
            log::warn!("vehicle {vehicle_id} is assigned to missing route {route_index}");
            continue;
        };

        let mut segments = Vec::new();
        let mut total_distance = 0.0;
        let mut total_time = 0.0;
        for pair in stops.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let segment = expand_segment(graph, path_finder, time, location_index, from, to)?;
            total_distance += segment.distance;
            total_time += segment.time.unwrap_or(0.0);
            segments.push(segment);
        }

        let vehicle = vehicle_of.get(vehicle_id.as_str()).copied();
        detailed_routes[route_index] = Some(DetailedRoute {
            vehicle_id: vehicle_id.clone(),
            stops: stops.clone(),
            segments,
            total_distance,
            total_time,
            capacity_utilization: vehicle
                .map_or(0.0, |vehicle| utilization(vehicle, stops, deliveries)),
            estimated_arrival_times: arrivals_of
                .get(vehicle_id)
                .cloned()
                .unwrap_or_default(),
        });
    }

    solution.detailed_routes = detailed_routes.into_iter().flatten().collect();
    Ok(())
}

fn expand_segment(
    graph: &Graph,
    path_finder: &dyn PathFind,
    time: Option<&SquareMatrix>,
    location_index: &HashMap<String, usize>,
    from: &str,
    to: &str,
) -> Result<RouteSegment, GraphError> {
    let result = path_finder.shortest_path(graph, from, to)?;

    let direct_time = |from: &str, to: &str| -> Option<f64> {
        let matrix = time?;
        let (&row, &col) = (location_index.get(from)?, location_index.get(to)?);
        Some(matrix.get(row, col))
    };

    if result.is_reachable() {
        let minutes = time.map(|_| {
            result
                .path
                .windows(2)
                .filter_map(|hop| direct_time(&hop[0], &hop[1]))
                .sum()
        });
        Ok(RouteSegment {
            from: from.to_owned(),
            to: to.to_owned(),
            path: result.path,
            distance: result.distance,
            time: minutes,
        })
    } else {
        log::warn!("no path from {from:?} to {to:?}; emitting sentinel segment");
        Ok(RouteSegment {
            from: from.to_owned(),
            to: to.to_owned(),
            path: vec![from.to_owned(), to.to_owned()],
            distance: MAX_SAFE_DISTANCE,
            time: direct_time(from, to),
        })
    }
}

/// Demand served on the route divided by vehicle capacity.
fn utilization(vehicle: &Vehicle, stops: &[String], deliveries: &[Delivery]) -> f64 {
    if vehicle.capacity == 0 {
        return 0.0;
    }
    let served: u32 = deliveries
        .iter()
        .filter(|delivery| stops.iter().any(|stop| stop == &delivery.location_id))
        .map(|delivery| delivery.demand)
        .sum();
    f64::from(served) / f64::from(vehicle.capacity)
}
