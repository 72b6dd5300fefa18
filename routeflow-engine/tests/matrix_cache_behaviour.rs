//! Provider caching behaviour through the full pipeline.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use routeflow_core::test_support::{customer, delivery, depot, vehicle};
use routeflow_core::{EngineConfig, Location, SolutionStatus, SquareMatrix};
use routeflow_engine::{OptimizeRequest, Optimizer};
use routeflow_matrix::{
    DistanceMatrixBuilder, MatrixProvider, ProviderError, ProviderMatrices, RetryPolicy,
};
use rstest::rstest;

/// Provider stub returning fixed matrices and counting invocations.
struct CountingProvider {
    calls: AtomicU32,
}

impl MatrixProvider for CountingProvider {
    fn fetch_matrices(
        &self,
        locations: &[Location],
        _api_key: &str,
    ) -> Result<ProviderMatrices, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let size = locations.len();
        let mut distance = SquareMatrix::zeros(size);
        let mut time = SquareMatrix::zeros(size);
        for row in 0..size {
            for col in 0..size {
                if row != col {
                    distance.set(row, col, 30.0);
                    time.set(row, col, 45.0);
                }
            }
        }
        Ok(ProviderMatrices { distance, time })
    }
}

fn api_optimizer(provider: Arc<CountingProvider>) -> Optimizer {
    let mut config = EngineConfig::default();
    config.google_maps_api_key = Some("test-key".to_owned());
    let builder = DistanceMatrixBuilder::new()
        .with_provider(provider)
        .with_retry(RetryPolicy {
            max_retries: 0,
            backoff_factor: 1.0,
            retry_delay: std::time::Duration::ZERO,
        });
    Optimizer::new(config).with_matrix_builder(builder)
}

fn request(delivery_id: &str) -> OptimizeRequest {
    let mut request = OptimizeRequest::new(
        vec![depot("depot", 0.0, 0.0), customer("a", 0.0, 1.0)],
        vec![vehicle("v1", 10, "depot")],
        vec![delivery(delivery_id, "a", 5)],
    );
    request.use_api = Some(true);
    request.time_limit_seconds = 0;
    request
}

#[rstest]
fn provider_is_invoked_at_most_once_for_identical_locations() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicU32::new(0),
    });
    let optimizer = api_optimizer(provider.clone());

    // Distinct delivery IDs dodge the result cache, so the second solve
    // exercises the matrix cache.
    let first = optimizer.optimize(&request("p1")).unwrap();
    let second = optimizer.optimize(&request("p2")).unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.status, SolutionStatus::Success);
    assert_eq!(first.total_distance, second.total_distance);
    assert_eq!(first.total_distance, 60.0);
}

#[rstest]
fn identical_requests_solve_once() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicU32::new(0),
    });
    let optimizer = api_optimizer(provider.clone());

    let first = optimizer.optimize(&request("p1")).unwrap();
    let second = optimizer.optimize(&request("p1")).unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

#[rstest]
fn testing_mode_never_touches_the_provider() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicU32::new(0),
    });
    let mut config = EngineConfig::default().for_testing();
    config.google_maps_api_key = Some("test-key".to_owned());
    let optimizer = Optimizer::new(config)
        .with_matrix_builder(DistanceMatrixBuilder::new().with_provider(provider.clone()));

    let solution = optimizer.optimize(&request("p1")).unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(solution.status, SolutionStatus::Success);
}
