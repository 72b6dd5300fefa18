//! Core domain types for the Routeflow optimization engine.
//!
//! This crate defines the request entities (locations, vehicles,
//! deliveries), the solution DTOs produced by a solve, the square matrix
//! and adjacency-graph representations shared by the matrix and solver
//! backends, and the narrow capability traits ([`VrpSolve`], [`PathFind`],
//! [`Cache`]) through which the orchestration layer holds its
//! collaborators. Constructors validate invariants and return `Result` so
//! invalid input surfaces early.

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod constants;
pub mod graph;
pub mod matrix;
pub mod solution;
pub mod solver;
pub mod test_support;
mod types;

pub use cache::{Cache, MemoryCache};
pub use config::EngineConfig;
pub use graph::{DijkstraPathFinder, Graph, GraphError, PathFind, PathResult};
pub use matrix::{MatrixError, SquareMatrix};
pub use solution::{
    DetailedRoute, RerouteReason, ReroutingInfo, RouteSegment, Solution, SolutionStatus,
    Statistics, VehicleCost,
};
pub use solver::{SolverInput, VrpSolve};
pub use types::{Delivery, Location, LocationError, Vehicle, VehicleError};
