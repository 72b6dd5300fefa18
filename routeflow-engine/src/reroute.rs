//! Dynamic rerouting: traffic, service delays, and roadblocks.
//!
//! Each policy filters out completed deliveries, advances vehicle start
//! positions to their last completed stop, mutates the inputs to reflect
//! the event, and delegates the fresh solve to the optimizer. The new
//! solution carries a [`ReroutingInfo`] summary in its statistics.

use std::collections::{HashMap, HashSet};

use routeflow_core::constants::DEFAULT_SERVICE_TIME_MINUTES;
use routeflow_core::{
    Delivery, Location, PathFind, RerouteReason, ReroutingInfo, Solution, Vehicle, VrpSolve,
};
use routeflow_matrix::TrafficData;

use crate::optimizer::{InvalidInput, OptimizeRequest, Optimizer};

/// Shared inputs of every rerouting operation.
#[derive(Debug, Clone)]
pub struct RerouteContext {
    /// The plan being replaced.
    pub current_solution: Solution,
    /// Geographic points of the original request.
    pub locations: Vec<Location>,
    /// Fleet of the original request.
    pub vehicles: Vec<Vehicle>,
    /// The original batch of deliveries.
    pub original_deliveries: Vec<Delivery>,
    /// Deliveries already completed when the event arrived.
    pub completed_delivery_ids: Vec<String>,
    /// Overrides the configured default for consulting the external
    /// provider.
    pub use_api: Option<bool>,
    /// Budget for the re-solve, seconds.
    pub time_limit_seconds: u64,
}

/// Mutates solver inputs in response to real-world events and re-invokes
/// the optimizer.
pub struct Rerouter<'a, S, P>
where
    S: VrpSolve,
    P: PathFind,
{
    optimizer: &'a Optimizer<S, P>,
}

impl<'a, S, P> Rerouter<'a, S, P>
where
    S: VrpSolve,
    P: PathFind,
{
    /// A rerouter delegating to `optimizer`.
    pub fn new(optimizer: &'a Optimizer<S, P>) -> Self {
        Self { optimizer }
    }

    /// Re-solves the remaining work under changed traffic conditions.
    pub fn reroute_for_traffic(
        &self,
        context: &RerouteContext,
        traffic_data: &TrafficData,
    ) -> Result<Solution, InvalidInput> {
        let remaining = remaining_deliveries(context);
        let mut request = self.base_request(context, remaining);
        request.consider_traffic = true;
        request.traffic_data = Some(traffic_data.clone());

        let mut solution = self.optimizer.optimize(&request)?;
        let mut info = self.rerouting_info(RerouteReason::Traffic, context, &request, &solution);
        info.traffic_factor_count = Some(traffic_data.len());
        solution.statistics.rerouting_info = Some(info);
        Ok(solution)
    }

    /// Re-solves with extended service times at delayed locations,
    /// forcing a time-window solve so the delays bind.
    pub fn reroute_for_delay(
        &self,
        context: &RerouteContext,
        delayed_location_ids: &[String],
        delay_minutes: f64,
    ) -> Result<Solution, InvalidInput> {
        let delayed: HashSet<&str> = delayed_location_ids
            .iter()
            .map(String::as_str)
            .collect();
        let remaining = remaining_deliveries(context);
        let mut request = self.base_request(context, remaining);
        request.consider_time_windows = true;
        for location in &mut request.locations {
            if delayed.contains(location.id.as_str()) {
                let base = location.service_time.unwrap_or(if location.is_depot {
                    0.0
                } else {
                    DEFAULT_SERVICE_TIME_MINUTES
                });
                location.service_time = Some(base + delay_minutes);
            }
        }

        let mut solution = self.optimizer.optimize(&request)?;
        let mut info =
            self.rerouting_info(RerouteReason::ServiceDelay, context, &request, &solution);
        info.delay_minutes = Some(delay_minutes);
        info.delayed_location_ids = delayed_location_ids.to_vec();
        solution.statistics.rerouting_info = Some(info);
        Ok(solution)
    }

    /// Re-solves with the blocked segments priced out of the matrix.
    ///
    /// Each blocked pair becomes a non-finite traffic factor, which the
    /// application step pins at the distance sentinel, excluding the
    /// edge.
    pub fn reroute_for_roadblock(
        &self,
        context: &RerouteContext,
        blocked_segments: &[(String, String)],
    ) -> Result<Solution, InvalidInput> {
        let traffic_data = TrafficData::from_segments(
            blocked_segments
                .iter()
                .map(|(from, to)| ((from.clone(), to.clone()), f64::INFINITY)),
        );
        let remaining = remaining_deliveries(context);
        let mut request = self.base_request(context, remaining);
        request.consider_traffic = true;
        request.traffic_data = Some(traffic_data);

        let mut solution = self.optimizer.optimize(&request)?;
        let mut info = self.rerouting_info(RerouteReason::Roadblock, context, &request, &solution);
        info.blocked_segments = blocked_segments.to_vec();
        solution.statistics.rerouting_info = Some(info);
        Ok(solution)
    }

    fn base_request(&self, context: &RerouteContext, remaining: Vec<Delivery>) -> OptimizeRequest {
        let mut request = OptimizeRequest::new(
            context.locations.clone(),
            update_vehicle_positions(context),
            remaining,
        );
        request.use_api = context.use_api;
        request.time_limit_seconds = context.time_limit_seconds;
        request
    }

    fn rerouting_info(
        &self,
        reason: RerouteReason,
        context: &RerouteContext,
        request: &OptimizeRequest,
        solution: &Solution,
    ) -> ReroutingInfo {
        ReroutingInfo {
            reason,
            original_total_distance: context.current_solution.total_distance,
            new_total_distance: solution.total_distance,
            completed_delivery_count: context.completed_delivery_ids.len(),
            rerouted_delivery_count: request.deliveries.len(),
            traffic_factor_count: None,
            delay_minutes: None,
            delayed_location_ids: Vec::new(),
            blocked_segments: Vec::new(),
        }
    }
}

/// The original deliveries minus the completed ones.
fn remaining_deliveries(context: &RerouteContext) -> Vec<Delivery> {
    let completed: HashSet<&str> = context
        .completed_delivery_ids
        .iter()
        .map(String::as_str)
        .collect();
    context
        .original_deliveries
        .iter()
        .filter(|delivery| !completed.contains(delivery.id.as_str()))
        .cloned()
        .collect()
}

/// Advances each vehicle's start to the last stop on its current route
/// with a completed delivery. Vehicles without completed work keep their
/// original start. Mid-segment positions are not modelled.
fn update_vehicle_positions(context: &RerouteContext) -> Vec<Vehicle> {
    let location_of: HashMap<&str, &str> = context
        .original_deliveries
        .iter()
        .map(|delivery| (delivery.id.as_str(), delivery.location_id.as_str()))
        .collect();
    let completed_locations: HashSet<&str> = context
        .completed_delivery_ids
        .iter()
        .filter_map(|id| location_of.get(id.as_str()).copied())
        .collect();

    let mut vehicles = context.vehicles.clone();
    for vehicle in &mut vehicles {
        let Some(&route_index) = context.current_solution.assigned_vehicles.get(&vehicle.id)
        else {
            continue;
        };
        let Some(route) = context.current_solution.routes.get(route_index) else {
            continue;
        };
        let last_completed = route
            .iter()
            .rev()
            .find(|stop| completed_locations.contains(stop.as_str()));
        if let Some(stop) = last_completed {
            log::info!(
                "vehicle {} advanced from {} to {stop} after completed deliveries",
                vehicle.id,
                vehicle.start_location_id
            );
            vehicle.start_location_id = stop.clone();
        }
    }
    vehicles
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeflow_core::test_support::{delivery, vehicle};
    use rstest::rstest;

    fn context_fixture() -> RerouteContext {
        let mut current = Solution::success();
        current.routes = vec![vec![
            "d".to_owned(),
            "a".to_owned(),
            "b".to_owned(),
            "d".to_owned(),
        ]];
        current.total_distance = 30.0;
        current.assigned_vehicles.insert("v1".into(), 0);
        RerouteContext {
            current_solution: current,
            locations: Vec::new(),
            vehicles: vec![vehicle("v1", 10, "d")],
            original_deliveries: vec![delivery("p1", "a", 2), delivery("p2", "b", 2)],
            completed_delivery_ids: vec!["p1".to_owned()],
            use_api: None,
            time_limit_seconds: 0,
        }
    }

    #[rstest]
    fn remaining_deliveries_excludes_completed() {
        let context = context_fixture();
        let remaining = remaining_deliveries(&context);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "p2");
    }

    #[rstest]
    fn vehicle_advances_to_last_completed_stop() {
        let mut context = context_fixture();
        context.completed_delivery_ids = vec!["p1".to_owned(), "p2".to_owned()];
        let vehicles = update_vehicle_positions(&context);
        assert_eq!(vehicles[0].start_location_id, "b");
    }

    #[rstest]
    fn vehicle_without_completed_work_keeps_its_start() {
        let mut context = context_fixture();
        context.completed_delivery_ids.clear();
        let vehicles = update_vehicle_positions(&context);
        assert_eq!(vehicles[0].start_location_id, "d");
    }

    #[rstest]
    fn unassigned_vehicle_is_untouched() {
        let mut context = context_fixture();
        context.vehicles.push(vehicle("v2", 10, "d"));
        let vehicles = update_vehicle_positions(&context);
        assert_eq!(vehicles[1].start_location_id, "d");
    }
}
