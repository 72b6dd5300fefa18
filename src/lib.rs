//! Facade crate for the Routeflow optimization engine.
//!
//! Re-exports the core domain types and exposes the matrix, solver, and
//! orchestration backends behind feature flags.

#![forbid(unsafe_code)]

pub use routeflow_core::{
    Cache, Delivery, DijkstraPathFinder, EngineConfig, Graph, GraphError, Location,
    LocationError, MemoryCache, PathFind, PathResult, Solution, SolutionStatus, SolverInput,
    SquareMatrix, Statistics, Vehicle, VehicleError, VrpSolve,
};

#[cfg(feature = "matrix")]
pub use routeflow_matrix::{
    apply_traffic, cache_key, derive_time_matrix, matrix_to_graph, sanitize_matrix,
    DistanceMatrixBuilder, DistanceMetric, GoogleMatrixProvider, MatrixCacheEntry,
    MatrixProvider, SqliteMatrixCache, TrafficData,
};

#[cfg(feature = "solver-cp")]
pub use routeflow_solver::CpVrpSolver;

#[cfg(feature = "engine")]
pub use routeflow_engine::{
    add_statistics, annotate_solution, resolve_depot, InvalidInput, OptimizeRequest, Optimizer,
    RerouteContext, Rerouter,
};
