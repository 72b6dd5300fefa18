//! Distance-matrix construction with caching and provider fallback.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use geo::{HaversineDistance, Point};
use routeflow_core::{Cache, Location, MemoryCache, SquareMatrix};

use crate::cache::{cache_key, MatrixCacheEntry};
use crate::provider::MatrixProvider;
use crate::sanitize::sanitize_matrix;

/// Result of a matrix build: both matrices indexed by `location_ids`,
/// which follow the input order of the locations.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixBuild {
    /// Pairwise distances in kilometres, sanitized.
    pub distance: SquareMatrix,
    /// Pairwise travel times in minutes, sanitized; present only when the
    /// matrices came from the provider.
    pub time: Option<SquareMatrix>,
    /// Location IDs in matrix order.
    pub location_ids: Vec<String>,
}

/// Metric for locally computed matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Great-circle distance on the WGS84 sphere, in kilometres.
    #[default]
    Haversine,
    /// Plane distance over raw coordinates; a test fallback.
    Euclidean,
}

/// Retry envelope for provider fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Multiplier applied to the delay after each failure.
    pub backoff_factor: f64,
    /// Delay before the first retry.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 2.0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Builds distance (and time) matrices from locations.
///
/// Without a provider, or when the provider keeps failing, matrices come
/// from the Haversine metric. Provider results are cached under a
/// deterministic key; fallback results are not cached.
pub struct DistanceMatrixBuilder {
    provider: Option<Arc<dyn MatrixProvider>>,
    cache: Arc<dyn Cache<MatrixCacheEntry>>,
    cache_expiry: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for DistanceMatrixBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceMatrixBuilder")
            .field("has_provider", &self.provider.is_some())
            .field("cache_expiry", &self.cache_expiry)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for DistanceMatrixBuilder {
    fn default() -> Self {
        Self {
            provider: None,
            cache: Arc::new(MemoryCache::new()),
            cache_expiry: Duration::from_secs(30 * 24 * 60 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

impl DistanceMatrixBuilder {
    /// A builder with no provider and an in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the external provider used when `use_api` is requested.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn MatrixProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replaces the matrix cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache<MatrixCacheEntry>>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the lifetime of cached provider results.
    #[must_use]
    pub fn with_cache_expiry(mut self, expiry: Duration) -> Self {
        self.cache_expiry = expiry;
        self
    }

    /// Replaces the retry envelope.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds matrices for `locations`.
    ///
    /// The provider path is taken only when `use_api` is true, a key is
    /// present, and a provider is attached; otherwise distances come from
    /// the Haversine metric and no time matrix is produced. Both matrices
    /// are sanitized before return.
    #[must_use]
    pub fn build(
        &self,
        locations: &[Location],
        use_api: bool,
        api_key: Option<&str>,
    ) -> MatrixBuild {
        let provider = match (use_api, api_key, &self.provider) {
            (true, Some(key), Some(provider)) if !key.is_empty() => Some((key, provider)),
            (true, _, _) => {
                log::warn!("API build requested without key or provider; using Haversine");
                None
            }
            _ => None,
        };

        let Some((api_key, provider)) = provider else {
            return Self::build_offline(locations, DistanceMetric::Haversine);
        };

        let key = cache_key(locations);
        if let Some(entry) = self.cache.get(&key) {
            log::debug!("matrix cache hit for {key}");
            return MatrixBuild {
                distance: sanitize_matrix(&entry.distance_matrix),
                time: entry.time_matrix.as_ref().map(sanitize_matrix),
                location_ids: entry.location_ids,
            };
        }

        match self.fetch_with_retries(provider.as_ref(), locations, api_key) {
            Ok(matrices) => {
                let distance = sanitize_matrix(&matrices.distance);
                let time = sanitize_matrix(&matrices.time);
                let location_ids: Vec<String> =
                    locations.iter().map(|location| location.id.clone()).collect();
                self.cache.put(
                    &key,
                    MatrixCacheEntry {
                        distance_matrix: distance.clone(),
                        time_matrix: Some(time.clone()),
                        location_ids: location_ids.clone(),
                        created_at: Utc::now(),
                    },
                    self.cache_expiry,
                );
                MatrixBuild {
                    distance,
                    time: Some(time),
                    location_ids,
                }
            }
            Err(err) => {
                log::warn!("provider unavailable, falling back to Haversine: {err}");
                Self::build_offline(locations, DistanceMetric::Haversine)
            }
        }
    }

    /// Builds matrices locally with the given metric; no cache, no time
    /// matrix.
    #[must_use]
    pub fn build_offline(locations: &[Location], metric: DistanceMetric) -> MatrixBuild {
        let size = locations.len();
        let mut distance = SquareMatrix::zeros(size);
        for i in 0..size {
            for j in (i + 1)..size {
                let value = match metric {
                    DistanceMetric::Haversine => haversine_km(&locations[i], &locations[j]),
                    DistanceMetric::Euclidean => euclidean(&locations[i], &locations[j]),
                };
                distance.set(i, j, value);
                distance.set(j, i, value);
            }
        }
        MatrixBuild {
            distance: sanitize_matrix(&distance),
            time: None,
            location_ids: locations.iter().map(|location| location.id.clone()).collect(),
        }
    }

    fn fetch_with_retries(
        &self,
        provider: &dyn MatrixProvider,
        locations: &[Location],
        api_key: &str,
    ) -> Result<crate::provider::ProviderMatrices, crate::provider::ProviderError> {
        let mut delay = self.retry.retry_delay;
        let mut attempt = 0;
        loop {
            match provider.fetch_matrices(locations, api_key) {
                Ok(matrices) => return Ok(matrices),
                Err(err) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "provider fetch failed (attempt {attempt}/{}): {err}; retrying in {delay:?}",
                        self.retry.max_retries
                    );
                    thread::sleep(delay);
                    delay = delay.mul_f64(self.retry.backoff_factor.max(1.0));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Great-circle distance between two locations in kilometres.
fn haversine_km(from: &Location, to: &Location) -> f64 {
    let origin = Point::new(from.longitude, from.latitude);
    let destination = Point::new(to.longitude, to.latitude);
    origin.haversine_distance(&destination) / 1000.0
}

/// Plane distance over raw coordinate degrees.
fn euclidean(from: &Location, to: &Location) -> f64 {
    let dx = from.latitude - to.latitude;
    let dy = from.longitude - to.longitude;
    dx.hypot(dy)
}

/// Derives a travel-time matrix (minutes) from distances (kilometres) at
/// a nominal speed, preserving sentinel entries.
#[must_use]
pub fn derive_time_matrix(distance: &SquareMatrix, speed_kmh: f64) -> SquareMatrix {
    use routeflow_core::constants::MAX_SAFE_DISTANCE;

    let mut time = SquareMatrix::zeros(distance.size());
    for (row, col, kilometres) in distance.entries() {
        if row == col {
            continue;
        }
        let minutes = if kilometres >= MAX_SAFE_DISTANCE {
            MAX_SAFE_DISTANCE
        } else {
            kilometres / speed_kmh * 60.0
        };
        time.set(row, col, minutes);
    }
    sanitize_matrix(&time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MatrixProvider, ProviderError, ProviderMatrices};
    use routeflow_core::test_support::{customer, depot};
    use rstest::{fixture, rstest};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[fixture]
    fn pair() -> Vec<Location> {
        vec![depot("depot", 0.0, 0.0), customer("a", 0.0, 1.0)]
    }

    struct CountingProvider {
        calls: AtomicU32,
        fail_first: u32,
    }

    impl CountingProvider {
        fn new(fail_first: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first,
            }
        }
    }

    impl MatrixProvider for CountingProvider {
        fn fetch_matrices(
            &self,
            locations: &[Location],
            _api_key: &str,
        ) -> Result<ProviderMatrices, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(ProviderError::Network {
                    url: "stub".into(),
                    message: "connection refused".into(),
                });
            }
            let size = locations.len();
            let mut distance = SquareMatrix::zeros(size);
            let mut time = SquareMatrix::zeros(size);
            for i in 0..size {
                for j in 0..size {
                    if i != j {
                        distance.set(i, j, 42.0);
                        time.set(i, j, 21.0);
                    }
                }
            }
            Ok(ProviderMatrices { distance, time })
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            backoff_factor: 1.0,
            retry_delay: Duration::ZERO,
        }
    }

    #[rstest]
    fn haversine_build_matches_known_distance(pair: Vec<Location>) {
        let build = DistanceMatrixBuilder::build_offline(&pair, DistanceMetric::Haversine);

        // One degree of longitude on the equator is about 111.195 km.
        let distance = build.distance.get(0, 1);
        assert!((distance - 111.195).abs() < 0.1, "got {distance}");
        assert_eq!(build.distance.get(0, 0), 0.0);
        assert!(build.time.is_none());
        assert_eq!(build.location_ids, vec!["depot", "a"]);
    }

    #[rstest]
    fn euclidean_metric_is_plane_distance(pair: Vec<Location>) {
        let build = DistanceMatrixBuilder::build_offline(&pair, DistanceMetric::Euclidean);
        assert_eq!(build.distance.get(0, 1), 1.0);
    }

    #[rstest]
    fn api_without_key_falls_back_to_haversine(pair: Vec<Location>) {
        let provider = Arc::new(CountingProvider::new(0));
        let builder = DistanceMatrixBuilder::new().with_provider(provider.clone());

        let build = builder.build(&pair, true, None);

        assert!(build.time.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn provider_result_is_cached(pair: Vec<Location>) {
        let provider = Arc::new(CountingProvider::new(0));
        let builder = DistanceMatrixBuilder::new()
            .with_provider(provider.clone())
            .with_retry(fast_retry());

        let first = builder.build(&pair, true, Some("key"));
        let second = builder.build(&pair, true, Some("key"));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.distance.get(0, 1), 42.0);
        assert_eq!(first.time.as_ref().map(|t| t.get(0, 1)), Some(21.0));
    }

    #[rstest]
    fn transient_failures_are_retried(pair: Vec<Location>) {
        let provider = Arc::new(CountingProvider::new(1));
        let builder = DistanceMatrixBuilder::new()
            .with_provider(provider.clone())
            .with_retry(fast_retry());

        let build = builder.build(&pair, true, Some("key"));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(build.distance.get(0, 1), 42.0);
    }

    #[rstest]
    fn exhausted_retries_fall_back_and_do_not_cache(pair: Vec<Location>) {
        // Fails the initial attempt and both retries of the first build,
        // then recovers.
        let provider = Arc::new(CountingProvider::new(3));
        let builder = DistanceMatrixBuilder::new()
            .with_provider(provider.clone())
            .with_retry(fast_retry());

        let fallback = builder.build(&pair, true, Some("key"));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert!(fallback.time.is_none());
        assert!((fallback.distance.get(0, 1) - 111.195).abs() < 0.1);

        // The fallback was not cached: the recovered provider is
        // consulted on the next build and its matrices win.
        let second = builder.build(&pair, true, Some("key"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
        assert_eq!(second.distance.get(0, 1), 42.0);
    }

    #[rstest]
    fn derive_time_matrix_uses_nominal_speed() {
        let mut distance = SquareMatrix::zeros(2);
        distance.set(0, 1, 50.0);
        distance.set(1, 0, routeflow_core::constants::MAX_SAFE_DISTANCE);

        let time = derive_time_matrix(&distance, 50.0);

        assert_eq!(time.get(0, 1), 60.0);
        assert_eq!(
            time.get(1, 0),
            routeflow_core::constants::MAX_SAFE_DISTANCE
        );
    }
}
