//! Integer-scaled routing model: dimensions, feasibility, and cost.
//!
//! Real-valued inputs are scaled to integers before the search touches
//! them and unscaled on readback. A model owns one node per delivery
//! location (aggregating demand, penalty, and skill requirements), one
//! spec per dispatchable vehicle, and the scaled matrices the dimensions
//! step over.

use std::collections::{BTreeSet, HashMap};

use routeflow_core::constants::{
    CAPACITY_SCALING_FACTOR, COST_COEFFICIENT_FOR_LOAD_BALANCE, DISJUNCTION_PENALTY_BASE,
    DISTANCE_SCALING_FACTOR, MAX_ROUTE_DISTANCE_UNSCALED, MAX_ROUTE_DURATION_UNSCALED,
    TIME_SCALING_FACTOR,
};
use routeflow_core::{SolverInput, SquareMatrix};
use thiserror::Error;

/// A visitable node carrying the deliveries of one location.
#[derive(Debug, Clone)]
pub(crate) struct StopNode {
    /// Matrix index of the node's location.
    pub location: usize,
    /// Net scaled demand; pickups subtract.
    pub demand: i64,
    /// Cost of leaving this node unserved.
    pub penalty: i64,
    /// Deliveries aggregated into this node, in input order.
    pub delivery_ids: Vec<String>,
    /// Union of the deliveries' required skills.
    pub required_skills: BTreeSet<String>,
}

/// A dispatchable vehicle with scaled bounds.
#[derive(Debug, Clone)]
pub(crate) struct VehicleSpec {
    /// Vehicle identifier.
    pub id: String,
    /// Scaled capacity bound.
    pub capacity: i64,
    /// Matrix index the route starts at.
    pub start: usize,
    /// Matrix index the route ends at.
    pub end: usize,
    /// Scaled distance bound.
    pub max_distance: i64,
    /// Bound on non-depot stops, when declared.
    pub max_stops: Option<usize>,
    /// Capabilities offered.
    pub skills: BTreeSet<String>,
}

/// Errors raised while translating a [`SolverInput`] into a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum ModelError {
    /// The distance matrix does not match the location count.
    #[error("distance matrix is {matrix} x {matrix} but there are {locations} locations")]
    MatrixShape { matrix: usize, locations: usize },
    /// The time matrix does not match the location count.
    #[error("time matrix is {matrix} x {matrix} but there are {locations} locations")]
    TimeMatrixShape { matrix: usize, locations: usize },
    /// A delivery references a location absent from the request.
    #[error("delivery {delivery} references unknown location {location}")]
    UnknownDeliveryLocation { delivery: String, location: String },
    /// A vehicle references a location absent from the request.
    #[error("vehicle {vehicle} references unknown location {location}")]
    UnknownVehicleLocation { vehicle: String, location: String },
    /// The depot index is outside the matrix.
    #[error("depot index {depot} is outside the {locations}-location request")]
    DepotOutOfRange { depot: usize, locations: usize },
}

/// The solver's integer view of one dispatch problem.
#[derive(Debug)]
pub(crate) struct RoutingModel {
    /// Scaled pairwise distances, row-major.
    distance: Vec<i64>,
    /// Scaled pairwise travel times, when solving with time windows.
    time: Option<Vec<i64>>,
    /// Scaled service time per location.
    service: Vec<i64>,
    /// Scaled `[start, end]` window per location.
    windows: Vec<Option<(i64, i64)>>,
    /// Matrix dimension.
    size: usize,
    /// Visitable nodes.
    pub stops: Vec<StopNode>,
    /// Dispatchable vehicles.
    pub vehicles: Vec<VehicleSpec>,
    /// Scaled bound on a route's total duration.
    max_duration: i64,
}

/// A forward time schedule for one route.
#[derive(Debug, Clone)]
pub(crate) struct RouteSchedule {
    /// Cumulative time at the start, each stop, and the end.
    pub cumulative: Vec<i64>,
}

impl RouteSchedule {
    /// Total duration from route start to route end.
    pub fn duration(&self) -> i64 {
        match (self.cumulative.first(), self.cumulative.last()) {
            (Some(&first), Some(&last)) => last - first,
            _ => 0,
        }
    }
}

fn scale(value: f64, factor: f64) -> i64 {
    let scaled = (value * factor).round();
    if scaled >= i64::MAX as f64 {
        i64::MAX
    } else if scaled <= 0.0 {
        0
    } else {
        scaled as i64
    }
}

fn scale_matrix(matrix: &SquareMatrix, factor: f64) -> Vec<i64> {
    let size = matrix.size();
    let mut scaled = vec![0_i64; size * size];
    for (row, col, value) in matrix.entries() {
        scaled[row * size + col] = scale(value, factor);
    }
    scaled
}

impl RoutingModel {
    /// Translates a solver input into the scaled model.
    ///
    /// `with_time` demands a time matrix and activates the time
    /// dimension; without it, windows and service times are ignored.
    pub fn build(input: &SolverInput<'_>, with_time: bool) -> Result<Self, ModelError> {
        let locations = input.locations.len();
        if input.distance.size() != locations {
            return Err(ModelError::MatrixShape {
                matrix: input.distance.size(),
                locations,
            });
        }
        if input.depot_index >= locations {
            return Err(ModelError::DepotOutOfRange {
                depot: input.depot_index,
                locations,
            });
        }

        let index_of: HashMap<&str, usize> = input
            .locations
            .iter()
            .enumerate()
            .map(|(index, location)| (location.id.as_str(), index))
            .collect();

        let time = if with_time {
            let matrix = input.time.ok_or(ModelError::TimeMatrixShape {
                matrix: 0,
                locations,
            })?;
            if matrix.size() != locations {
                return Err(ModelError::TimeMatrixShape {
                    matrix: matrix.size(),
                    locations,
                });
            }
            Some(scale_matrix(matrix, TIME_SCALING_FACTOR))
        } else {
            None
        };

        let service = input
            .locations
            .iter()
            .map(|location| {
                let minutes = location.service_time.unwrap_or(if location.is_depot {
                    0.0
                } else {
                    routeflow_core::constants::DEFAULT_SERVICE_TIME_MINUTES
                });
                scale(minutes, TIME_SCALING_FACTOR)
            })
            .collect();

        let windows = input
            .locations
            .iter()
            .map(|location| {
                location.time_window().map(|(start, end)| {
                    (
                        scale(start, TIME_SCALING_FACTOR),
                        scale(end, TIME_SCALING_FACTOR),
                    )
                })
            })
            .collect();

        // Aggregate deliveries into one node per served location.
        let mut stops: Vec<StopNode> = Vec::new();
        let mut node_of_location: HashMap<usize, usize> = HashMap::new();
        for delivery in input.deliveries {
            let &location = index_of.get(delivery.location_id.as_str()).ok_or_else(|| {
                ModelError::UnknownDeliveryLocation {
                    delivery: delivery.id.clone(),
                    location: delivery.location_id.clone(),
                }
            })?;
            let node = *node_of_location.entry(location).or_insert_with(|| {
                stops.push(StopNode {
                    location,
                    demand: 0,
                    penalty: 0,
                    delivery_ids: Vec::new(),
                    required_skills: BTreeSet::new(),
                });
                stops.len() - 1
            });
            let stop = &mut stops[node];
            stop.demand += scale_signed(
                delivery.signed_demand() as f64,
                CAPACITY_SCALING_FACTOR,
            );
            stop.penalty += i64::from(delivery.priority) * DISJUNCTION_PENALTY_BASE;
            stop.delivery_ids.push(delivery.id.clone());
            stop.required_skills
                .extend(delivery.required_skills.iter().cloned());
        }

        let mut vehicles = Vec::new();
        for vehicle in input.vehicles.iter().filter(|vehicle| vehicle.available) {
            let &start = index_of.get(vehicle.start_location_id.as_str()).ok_or_else(|| {
                ModelError::UnknownVehicleLocation {
                    vehicle: vehicle.id.clone(),
                    location: vehicle.start_location_id.clone(),
                }
            })?;
            let &end = index_of.get(vehicle.end_location()).ok_or_else(|| {
                ModelError::UnknownVehicleLocation {
                    vehicle: vehicle.id.clone(),
                    location: vehicle.end_location().to_owned(),
                }
            })?;
            let max_distance = vehicle
                .max_distance
                .unwrap_or(MAX_ROUTE_DISTANCE_UNSCALED)
                .min(MAX_ROUTE_DISTANCE_UNSCALED);
            vehicles.push(VehicleSpec {
                id: vehicle.id.clone(),
                capacity: scale(f64::from(vehicle.capacity), CAPACITY_SCALING_FACTOR),
                start,
                end,
                max_distance: scale(max_distance, DISTANCE_SCALING_FACTOR),
                max_stops: vehicle.max_stops,
                skills: vehicle.skills.clone(),
            });
        }

        Ok(Self {
            distance: scale_matrix(input.distance, DISTANCE_SCALING_FACTOR),
            time,
            service,
            windows,
            size: locations,
            stops,
            vehicles,
            max_duration: scale(MAX_ROUTE_DURATION_UNSCALED, TIME_SCALING_FACTOR),
        })
    }

    /// Whether the time dimension is active.
    pub fn has_time_dimension(&self) -> bool {
        self.time.is_some()
    }

    /// Scaled distance between two location indices.
    pub fn distance_between(&self, from: usize, to: usize) -> i64 {
        self.distance[from * self.size + to]
    }

    fn travel_time(&self, from: usize, to: usize) -> i64 {
        match &self.time {
            Some(time) => time[from * self.size + to],
            None => 0,
        }
    }

    /// Scaled length of `nodes` served by `vehicle`, start and end legs
    /// included.
    pub fn route_distance(&self, vehicle: &VehicleSpec, nodes: &[usize]) -> i64 {
        let mut total = 0;
        let mut previous = vehicle.start;
        for &node in nodes {
            total += self.distance_between(previous, self.stops[node].location);
            previous = self.stops[node].location;
        }
        total + self.distance_between(previous, vehicle.end)
    }

    /// Forward schedule along the route, inserting waiting time where a
    /// window opens later than the arrival. `None` when a window or the
    /// duration bound cannot be met.
    ///
    /// The cumulative at a node includes that node's service time, and
    /// window constraints bind the cumulative, not the raw arrival.
    pub fn schedule(&self, vehicle: &VehicleSpec, nodes: &[usize]) -> Option<RouteSchedule> {
        debug_assert!(self.time.is_some(), "schedule requires the time dimension");
        let mut cumulative = Vec::with_capacity(nodes.len() + 2);

        let mut now = match self.windows[vehicle.start] {
            Some((start, end)) => {
                if start > end {
                    return None;
                }
                start
            }
            None => 0,
        };
        let origin = now;
        cumulative.push(now);

        let mut previous = vehicle.start;
        for &node in nodes {
            let location = self.stops[node].location;
            now += self.travel_time(previous, location) + self.service[location];
            if let Some((start, end)) = self.windows[location] {
                if now < start {
                    now = start;
                }
                if now > end {
                    return None;
                }
            }
            cumulative.push(now);
            previous = location;
        }

        now += self.travel_time(previous, vehicle.end) + self.service[vehicle.end];
        if let Some((start, end)) = self.windows[vehicle.end] {
            if now < start {
                now = start;
            }
            if now > end {
                return None;
            }
        }
        cumulative.push(now);

        if now - origin > self.max_duration {
            return None;
        }
        Some(RouteSchedule { cumulative })
    }

    /// Whether `vehicle` can legally serve `nodes` in order.
    pub fn is_route_feasible(&self, vehicle: &VehicleSpec, nodes: &[usize]) -> bool {
        if let Some(max_stops) = vehicle.max_stops {
            if nodes.len() > max_stops {
                return false;
            }
        }

        // Cumulative load stays within [0, capacity] at every stop.
        let mut load = 0_i64;
        for &node in nodes {
            let stop = &self.stops[node];
            if !stop.required_skills.is_subset(&vehicle.skills) {
                return false;
            }
            load += stop.demand;
            if load < 0 || load > vehicle.capacity {
                return false;
            }
        }

        if self.route_distance(vehicle, nodes) > vehicle.max_distance {
            return false;
        }

        if self.time.is_some() && self.schedule(vehicle, nodes).is_none() {
            return false;
        }
        true
    }

    /// Per-vehicle cumulative of the cost-driving dimension: route
    /// duration when the time dimension is active, route length
    /// otherwise.
    pub fn route_span_value(&self, vehicle: &VehicleSpec, nodes: &[usize]) -> i64 {
        if self.time.is_some() {
            self.schedule(vehicle, nodes)
                .map_or(i64::MAX, |schedule| schedule.duration())
        } else {
            self.route_distance(vehicle, nodes)
        }
    }

    /// True objective of an assignment: scaled route distances, the
    /// load-balance span penalty, and the penalties of dropped nodes.
    pub fn objective(&self, routes: &[Vec<usize>], dropped: &BTreeSet<usize>) -> i64 {
        let mut total = 0;
        let mut span_max = 0;
        let mut span_min = i64::MAX;
        for (vehicle, nodes) in self.vehicles.iter().zip(routes) {
            total += self.route_distance(vehicle, nodes);
            let span = if nodes.is_empty() {
                0
            } else {
                self.route_span_value(vehicle, nodes)
            };
            span_max = span_max.max(span);
            span_min = span_min.min(span);
        }
        if !self.vehicles.is_empty() && span_max > span_min {
            total += COST_COEFFICIENT_FOR_LOAD_BALANCE * (span_max - span_min);
        }
        total + dropped.iter().map(|&node| self.stops[node].penalty).sum::<i64>()
    }

    /// Unscales a distance back to kilometres.
    pub fn unscale_distance(&self, scaled: i64) -> f64 {
        scaled as f64 / DISTANCE_SCALING_FACTOR
    }

    /// Unscales a time back to minutes.
    pub fn unscale_time(&self, scaled: i64) -> f64 {
        scaled as f64 / TIME_SCALING_FACTOR
    }
}

fn scale_signed(value: f64, factor: f64) -> i64 {
    let scaled = (value * factor).round();
    if scaled >= i64::MAX as f64 {
        i64::MAX
    } else if scaled <= i64::MIN as f64 {
        i64::MIN
    } else {
        scaled as i64
    }
}
