//! Orchestration pipeline for the Routeflow engine.
//!
//! Drives a solve end to end: input validation, matrix construction,
//! traffic application, depot resolution, solving, shortest-path
//! annotation, and statistics aggregation, with whole-result caching.
//! The rerouting policies mutate solver inputs to reflect real-world
//! events and delegate back to the optimizer.

#![forbid(unsafe_code)]

mod annotate;
mod depot;
mod optimizer;
mod reroute;
mod stats;

pub use annotate::annotate_solution;
pub use depot::resolve_depot;
pub use optimizer::{InvalidInput, OptimizeRequest, Optimizer};
pub use reroute::{RerouteContext, Rerouter};
pub use stats::add_statistics;
