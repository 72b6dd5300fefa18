//! Distance-matrix subsystem for the Routeflow engine.
//!
//! Builds pairwise distance (and optionally travel-time) matrices from
//! geographic inputs, either locally via great-circle distances or through
//! the external provider with caching, retry, and Haversine fallback.
//! Every matrix is sanitized before it leaves this crate, and traffic
//! factors are applied as a pure transformation.

#![forbid(unsafe_code)]

mod builder;
mod cache;
mod google;
mod graph;
mod provider;
mod sanitize;
mod traffic;

pub use builder::{derive_time_matrix, DistanceMatrixBuilder, DistanceMetric, MatrixBuild, RetryPolicy};
pub use cache::{cache_key, MatrixCacheEntry, SqliteCacheError, SqliteMatrixCache};
pub use graph::matrix_to_graph;
pub use provider::{
    GoogleMatrixProvider, GoogleMatrixProviderConfig, MatrixProvider, ProviderBuildError,
    ProviderError, ProviderMatrices,
};
pub use sanitize::sanitize_matrix;
pub use traffic::{apply_traffic, LocationPairFactor, TrafficData, TrafficFactors};
