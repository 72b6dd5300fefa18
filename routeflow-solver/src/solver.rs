//! Solver entry points and solution assembly.

use std::time::Instant;

use routeflow_core::{Solution, SolverInput, VrpSolve};

use crate::construction::{cheapest_insertion, Assignment};
use crate::local_search::GuidedLocalSearch;
use crate::model::{RoutingModel, VehicleSpec};

/// Constraint-based VRP solver: cheapest-arc construction followed by
/// guided local search within the caller's time limit.
///
/// Failure is reported through the returned [`Solution`]: malformed input
/// yields `error` with a diagnostic, an over-constrained model that drops
/// every delivery yields `no_solution`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpVrpSolver;

impl CpVrpSolver {
    /// A solver with default behaviour.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn run(&self, input: &SolverInput<'_>, with_time: bool) -> Solution {
        let all_delivery_ids: Vec<String> = input
            .deliveries
            .iter()
            .map(|delivery| delivery.id.clone())
            .collect();

        let model = match RoutingModel::build(input, with_time) {
            Ok(model) => model,
            Err(err) => {
                log::error!("solver rejected input: {err}");
                return Solution::error(err.to_string(), all_delivery_ids);
            }
        };

        if model.vehicles.is_empty() {
            return Solution::error("no vehicles available", all_delivery_ids);
        }

        if model.stops.is_empty() {
            return trivial_solution(input, &model);
        }

        let deadline = Instant::now() + input.time_limit;
        let constructed = cheapest_insertion(&model);
        let mut search = GuidedLocalSearch::new(&model, deadline);
        let improved = search.improve(constructed);

        assemble(input, &model, &improved)
    }
}

impl VrpSolve for CpVrpSolver {
    fn solve(&self, input: &SolverInput<'_>) -> Solution {
        self.run(input, false)
    }

    fn solve_with_time_windows(&self, input: &SolverInput<'_>) -> Solution {
        self.run(input, true)
    }
}

/// With no deliveries, every available vehicle gets the trivial route
/// `[depot]` and the solve succeeds at distance zero.
fn trivial_solution(input: &SolverInput<'_>, model: &RoutingModel) -> Solution {
    let depot_id = input.locations[input.depot_index].id.clone();
    let mut solution = Solution::success();
    for vehicle in &model.vehicles {
        let index = solution.routes.len();
        solution.routes.push(vec![depot_id.clone()]);
        solution.assigned_vehicles.insert(vehicle.id.clone(), index);
    }
    solution
}

fn route_location_ids(
    input: &SolverInput<'_>,
    model: &RoutingModel,
    vehicle: &VehicleSpec,
    nodes: &[usize],
) -> Vec<String> {
    let mut ids = Vec::with_capacity(nodes.len() + 2);
    ids.push(input.locations[vehicle.start].id.clone());
    for &node in nodes {
        ids.push(input.locations[model.stops[node].location].id.clone());
    }
    ids.push(input.locations[vehicle.end].id.clone());
    ids
}

fn assemble(input: &SolverInput<'_>, model: &RoutingModel, assignment: &Assignment) -> Solution {
    let mut unassigned: Vec<String> = assignment
        .dropped
        .iter()
        .flat_map(|&node| model.stops[node].delivery_ids.iter().cloned())
        .collect();
    unassigned.sort();

    // A model whose every node is dropped admits no dispatch at all.
    if !model.stops.is_empty() && assignment.dropped.len() == model.stops.len() {
        return Solution::no_solution(unassigned);
    }

    let mut solution = Solution::success();
    solution.unassigned_deliveries = unassigned;

    let mut total_scaled = 0_i64;
    for (vehicle, nodes) in model.vehicles.iter().zip(&assignment.routes) {
        if nodes.is_empty() {
            continue;
        }
        total_scaled += model.route_distance(vehicle, nodes);

        let index = solution.routes.len();
        solution.routes.push(route_location_ids(input, model, vehicle, nodes));
        solution.assigned_vehicles.insert(vehicle.id.clone(), index);

        if model.has_time_dimension() {
            if let Some(schedule) = model.schedule(vehicle, nodes) {
                let arrivals: Vec<f64> = schedule
                    .cumulative
                    .iter()
                    .map(|&value| model.unscale_time(value))
                    .collect();
                solution
                    .detailed_routes
                    .push(routeflow_core::DetailedRoute {
                        vehicle_id: vehicle.id.clone(),
                        stops: solution.routes[index].clone(),
                        segments: Vec::new(),
                        total_distance: 0.0,
                        total_time: 0.0,
                        capacity_utilization: 0.0,
                        estimated_arrival_times: arrivals,
                    });
            }
        }
    }
    solution.total_distance = model.unscale_distance(total_scaled);
    solution
}
