//! The optimization pipeline.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use routeflow_core::constants::DEFAULT_SPEED_KMH;
use routeflow_core::{
    Cache, Delivery, DijkstraPathFinder, EngineConfig, GraphError, Location, MemoryCache,
    PathFind, Solution, SolutionStatus, SolverInput, Vehicle, VrpSolve,
};
use routeflow_matrix::{
    apply_traffic, derive_time_matrix, matrix_to_graph, DistanceMatrixBuilder, TrafficData,
};
use routeflow_solver::CpVrpSolver;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request to compute routes for a fleet and a batch of deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    /// Geographic points of the request; matrix order follows this list.
    pub locations: Vec<Location>,
    /// Fleet to dispatch.
    pub vehicles: Vec<Vehicle>,
    /// Work to assign.
    pub deliveries: Vec<Delivery>,
    /// Whether to apply `traffic_data` to the cost-driving matrix.
    #[serde(default)]
    pub consider_traffic: bool,
    /// Whether to solve with time windows.
    #[serde(default)]
    pub consider_time_windows: bool,
    /// Traffic factors in either accepted wire form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_data: Option<TrafficData>,
    /// Overrides the configured default for consulting the external
    /// provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_api: Option<bool>,
    /// Budget for the solver's search, seconds.
    #[serde(default = "default_time_limit_seconds")]
    pub time_limit_seconds: u64,
}

fn default_time_limit_seconds() -> u64 {
    30
}

impl OptimizeRequest {
    /// A request with the default flags for the given entities.
    #[must_use]
    pub fn new(
        locations: Vec<Location>,
        vehicles: Vec<Vehicle>,
        deliveries: Vec<Delivery>,
    ) -> Self {
        Self {
            locations,
            vehicles,
            deliveries,
            consider_traffic: false,
            consider_time_windows: false,
            traffic_data: None,
            use_api: None,
            time_limit_seconds: default_time_limit_seconds(),
        }
    }

    fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_seconds)
    }
}

/// Malformed-request errors, surfaced to the caller and never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    /// The request carried no locations.
    #[error("request has no locations")]
    NoLocations,
    /// The request carried no vehicles.
    #[error("request has no vehicles")]
    NoVehicles,
    /// Two locations share an identifier.
    #[error("duplicate location id {id}")]
    DuplicateLocation { id: String },
    /// A delivery references a location absent from the request.
    #[error("delivery {delivery} references unknown location {location}")]
    UnknownDeliveryLocation { delivery: String, location: String },
    /// A delivery targets a depot.
    #[error("delivery {delivery} targets depot {location}")]
    DeliveryAtDepot { delivery: String, location: String },
    /// A vehicle references a location absent from the request.
    #[error("vehicle {vehicle} references unknown location {location}")]
    UnknownVehicleLocation { vehicle: String, location: String },
}

/// Pipeline stage names used in failure diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    BuildMatrix,
    ApplyTraffic,
    ResolveDepot,
    Solve,
    Annotate,
    Statistics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BuildMatrix => "matrix construction",
            Self::ApplyTraffic => "traffic application",
            Self::ResolveDepot => "depot resolution",
            Self::Solve => "solving",
            Self::Annotate => "path annotation",
            Self::Statistics => "statistics",
        };
        f.write_str(name)
    }
}

/// Orchestrates matrix construction, solving, annotation, and statistics,
/// caching whole results.
///
/// The solver and path finder are held through their capability traits,
/// so tests can substitute implementations without touching the
/// pipeline.
pub struct Optimizer<S = CpVrpSolver, P = DijkstraPathFinder>
where
    S: VrpSolve,
    P: PathFind,
{
    config: EngineConfig,
    solver: S,
    path_finder: P,
    matrix_builder: DistanceMatrixBuilder,
    result_cache: MemoryCache<Solution>,
}

impl Optimizer<CpVrpSolver, DijkstraPathFinder> {
    /// An optimizer with the default solver and path finder.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_components(config, CpVrpSolver::new(), DijkstraPathFinder)
    }
}

impl<S, P> Optimizer<S, P>
where
    S: VrpSolve,
    P: PathFind,
{
    /// An optimizer with explicit solver and path-finder implementations.
    pub fn with_components(config: EngineConfig, solver: S, path_finder: P) -> Self {
        let matrix_builder = DistanceMatrixBuilder::new()
            .with_cache_expiry(config.cache_expiry)
            .with_retry(routeflow_matrix::RetryPolicy {
                max_retries: config.max_retries,
                backoff_factor: config.backoff_factor,
                retry_delay: config.retry_delay,
            });
        Self {
            config,
            solver,
            path_finder,
            matrix_builder,
            result_cache: MemoryCache::new(),
        }
    }

    /// Replaces the matrix builder, e.g. to attach a provider or a
    /// persistent cache.
    #[must_use]
    pub fn with_matrix_builder(mut self, matrix_builder: DistanceMatrixBuilder) -> Self {
        self.matrix_builder = matrix_builder;
        self
    }

    /// The engine configuration in force.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the pipeline for `request`.
    ///
    /// Malformed requests fail with [`InvalidInput`]; every later failure
    /// folds into the returned [`Solution`] with `status = error` and a
    /// diagnostic naming the stage.
    pub fn optimize(&self, request: &OptimizeRequest) -> Result<Solution, InvalidInput> {
        let started_at = Instant::now();
        validate(request)?;

        let cache_key = result_cache_key(request, self.config.resolve_use_api(request.use_api));
        if let Some(cached) = self.result_cache.get(&cache_key) {
            log::debug!("result cache hit for {cache_key}");
            return Ok(cached);
        }

        let solution = match self.run_pipeline(request, started_at) {
            Ok(solution) => solution,
            Err((stage, message)) => {
                log::error!("{stage} failed: {message}");
                Solution::error(
                    format!("{stage} failed: {message}"),
                    request
                        .deliveries
                        .iter()
                        .map(|delivery| delivery.id.clone())
                        .collect(),
                )
            }
        };

        self.result_cache
            .put(&cache_key, solution.clone(), self.config.result_cache_timeout);
        Ok(solution)
    }

    fn run_pipeline(
        &self,
        request: &OptimizeRequest,
        started_at: Instant,
    ) -> Result<Solution, (Stage, String)> {
        log::debug!("stage: {}", Stage::BuildMatrix);
        let use_api = self.config.resolve_use_api(request.use_api);
        let build = self.matrix_builder.build(
            &request.locations,
            use_api,
            self.config.google_maps_api_key.as_deref(),
        );
        let mut distance = build.distance;
        let mut time = if request.consider_time_windows {
            Some(
                build
                    .time
                    .unwrap_or_else(|| derive_time_matrix(&distance, DEFAULT_SPEED_KMH)),
            )
        } else {
            build.time
        };
        let location_ids = build.location_ids;

        // Traffic lands on the cost-driving matrix: time when solving
        // with windows, distance otherwise.
        if request.consider_traffic {
            log::debug!("stage: {}", Stage::ApplyTraffic);
            if let Some(traffic_data) = &request.traffic_data {
                let factors = traffic_data.normalize(&location_ids);
                match (&mut time, request.consider_time_windows) {
                    (Some(time), true) => *time = apply_traffic(time, &factors),
                    _ => distance = apply_traffic(&distance, &factors),
                }
            }
        }

        log::debug!("stage: {}", Stage::ResolveDepot);
        let (_, depot_index) = crate::depot::resolve_depot(&request.locations)
            .ok_or((Stage::ResolveDepot, "no locations".to_owned()))?;

        log::debug!("stage: {}", Stage::Solve);
        let input = SolverInput {
            distance: &distance,
            time: time.as_ref(),
            locations: &request.locations,
            vehicles: &request.vehicles,
            deliveries: &request.deliveries,
            depot_index,
            time_limit: request.time_limit(),
        };
        let mut solution = if request.consider_time_windows {
            self.solver.solve_with_time_windows(&input)
        } else {
            self.solver.solve(&input)
        };

        if solution.status == SolutionStatus::Success {
            // Annotation runs over the sanitized distance matrix in
            // adjacency form.
            log::debug!("stage: {}", Stage::Annotate);
            let graph = matrix_to_graph(&distance, &location_ids);
            let isolated = graph.isolated_nodes();
            if !isolated.is_empty() {
                log::warn!("graph has isolated nodes: {isolated:?}");
            }
            let location_index: HashMap<String, usize> = location_ids
                .iter()
                .enumerate()
                .map(|(index, id)| (id.clone(), index))
                .collect();
            crate::annotate::annotate_solution(
                &mut solution,
                &graph,
                &self.path_finder,
                time.as_ref(),
                &location_index,
                &request.vehicles,
                &request.deliveries,
            )
            .map_err(|err: GraphError| (Stage::Annotate, err.to_string()))?;

            log::debug!("stage: {}", Stage::Statistics);
            crate::stats::add_statistics(
                &mut solution,
                &request.locations,
                &request.vehicles,
                &request.deliveries,
                Some(started_at.elapsed()),
            );
        }
        Ok(solution)
    }
}

fn validate(request: &OptimizeRequest) -> Result<(), InvalidInput> {
    if request.locations.is_empty() {
        return Err(InvalidInput::NoLocations);
    }
    if request.vehicles.is_empty() {
        return Err(InvalidInput::NoVehicles);
    }

    let mut seen = HashSet::new();
    for location in &request.locations {
        if !seen.insert(location.id.as_str()) {
            return Err(InvalidInput::DuplicateLocation {
                id: location.id.clone(),
            });
        }
    }

    let by_id: HashMap<&str, &Location> = request
        .locations
        .iter()
        .map(|location| (location.id.as_str(), location))
        .collect();

    for delivery in &request.deliveries {
        match by_id.get(delivery.location_id.as_str()) {
            None => {
                return Err(InvalidInput::UnknownDeliveryLocation {
                    delivery: delivery.id.clone(),
                    location: delivery.location_id.clone(),
                });
            }
            Some(location) if location.is_depot => {
                return Err(InvalidInput::DeliveryAtDepot {
                    delivery: delivery.id.clone(),
                    location: delivery.location_id.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for vehicle in &request.vehicles {
        for reference in [vehicle.start_location_id.as_str(), vehicle.end_location()] {
            if !by_id.contains_key(reference) {
                return Err(InvalidInput::UnknownVehicleLocation {
                    vehicle: vehicle.id.clone(),
                    location: reference.to_owned(),
                });
            }
        }
    }
    Ok(())
}

/// Deterministic key over the normalized request: sorted vehicle and
/// delivery IDs, location coordinates, and the flags that change the
/// outcome.
fn result_cache_key(request: &OptimizeRequest, use_api: bool) -> String {
    let mut vehicle_ids: Vec<&str> = request
        .vehicles
        .iter()
        .map(|vehicle| vehicle.id.as_str())
        .collect();
    vehicle_ids.sort_unstable();

    let mut delivery_ids: Vec<&str> = request
        .deliveries
        .iter()
        .map(|delivery| delivery.id.as_str())
        .collect();
    delivery_ids.sort_unstable();

    let mut coordinates: Vec<String> = request
        .locations
        .iter()
        .map(|location| {
            format!(
                "{}:{:.5}:{:.5}",
                location.id, location.latitude, location.longitude
            )
        })
        .collect();
    coordinates.sort_unstable();

    let traffic = match (&request.traffic_data, request.consider_traffic) {
        (Some(data), true) => {
            let mut entries: Vec<String> = data
                .normalize(
                    &request
                        .locations
                        .iter()
                        .map(|location| location.id.clone())
                        .collect::<Vec<_>>(),
                )
                .into_iter()
                .map(|((from, to), factor)| format!("{from}-{to}-{factor}"))
                .collect();
            entries.sort_unstable();
            entries.join(",")
        }
        _ => String::new(),
    };

    let digest = md5::compute(format!(
        "v={};d={};l={};traffic={};tw={};api={}",
        vehicle_ids.join(","),
        delivery_ids.join(","),
        coordinates.join(";"),
        traffic,
        request.consider_time_windows,
        use_api,
    ));
    format!("{digest:x}")
}
