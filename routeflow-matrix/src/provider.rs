//! HTTP provider for externally sourced distance and time matrices.
//!
//! [`GoogleMatrixProvider`] implements the synchronous [`MatrixProvider`]
//! trait by blocking on an owned single-threaded Tokio runtime, keeping
//! the matrix builder embeddable in synchronous contexts. Callers already
//! inside an async runtime should dispatch the build to a blocking task.

use std::time::Duration;

use reqwest::Client;
use routeflow_core::{Location, SquareMatrix};
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::google::DistanceMatrixResponse;

/// Matrices as fetched from a provider, already converted to the engine's
/// units (kilometres, minutes). Unroutable pairs carry `f64::NAN` and are
/// left to sanitization.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMatrices {
    /// Pairwise distances in kilometres.
    pub distance: SquareMatrix,
    /// Pairwise travel times in minutes.
    pub time: SquareMatrix,
}

/// Errors from a provider fetch. All variants are retryable; the builder
/// owns the retry envelope and the Haversine fallback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
    /// The transport failed below HTTP.
    #[error("network error calling {url}: {message}")]
    Network { url: String, message: String },
    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },
    /// The provider reported a request-level failure in its envelope.
    #[error("provider rejected the request: {status}: {message}")]
    Service { status: String, message: String },
    /// The response body could not be interpreted.
    #[error("failed to parse provider response: {message}")]
    Parse { message: String },
}

/// Fetch pairwise distance and duration matrices for a set of locations.
///
/// Implementers must return square `n x n` matrices where
/// `n == locations.len()`, ordered like the input.
pub trait MatrixProvider: Send + Sync {
    /// Fetches both matrices in one batch request.
    fn fetch_matrices(
        &self,
        locations: &[Location],
        api_key: &str,
    ) -> Result<ProviderMatrices, ProviderError>;
}

/// Error type for [`GoogleMatrixProvider`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default endpoint prefix; overridable for tests.
const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

/// Configuration for [`GoogleMatrixProvider`].
#[derive(Debug, Clone)]
pub struct GoogleMatrixProviderConfig {
    /// Scheme and host of the API, without a trailing path.
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
}

impl Default for GoogleMatrixProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GoogleMatrixProviderConfig {
    /// Overrides the endpoint host, e.g. for a local stub.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Distance Matrix API client bridging async HTTP behind the synchronous
/// [`MatrixProvider`] trait. The runtime is owned and reused across
/// calls.
pub struct GoogleMatrixProvider {
    client: Client,
    config: GoogleMatrixProviderConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for GoogleMatrixProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleMatrixProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GoogleMatrixProvider {
    /// Creates a provider with default configuration.
    pub fn new() -> Result<Self, ProviderBuildError> {
        Self::with_config(GoogleMatrixProviderConfig::default())
    }

    /// Creates a provider with explicit configuration.
    pub fn with_config(config: GoogleMatrixProviderConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Builds the request URL for a batch of locations.
    ///
    /// Origins and destinations are the same `lat,lng` list, so one call
    /// yields the full square matrix.
    fn build_url(&self, locations: &[Location], api_key: &str) -> String {
        let coordinates: String = locations
            .iter()
            .map(|location| format!("{:.5},{:.5}", location.latitude, location.longitude))
            .collect::<Vec<_>>()
            .join("|");

        format!(
            "{}/maps/api/distancematrix/json?origins={coordinates}&destinations={coordinates}&key={api_key}",
            self.config.base_url.trim_end_matches('/'),
        )
    }

    async fn fetch_async(
        &self,
        locations: &[Location],
        api_key: &str,
    ) -> Result<ProviderMatrices, ProviderError> {
        let url = self.build_url(locations, api_key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        let envelope: DistanceMatrixResponse =
            response.json().await.map_err(|err| ProviderError::Parse {
                message: err.to_string(),
            })?;

        convert_response(&envelope, locations.len())
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> ProviderError {
        if error.is_timeout() {
            return ProviderError::Timeout {
                url: redact_key(url),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return ProviderError::Http {
                url: redact_key(url),
                status: status.as_u16(),
            };
        }
        ProviderError::Network {
            url: redact_key(url),
            message: error.to_string(),
        }
    }
}

impl MatrixProvider for GoogleMatrixProvider {
    fn fetch_matrices(
        &self,
        locations: &[Location],
        api_key: &str,
    ) -> Result<ProviderMatrices, ProviderError> {
        self.runtime.block_on(self.fetch_async(locations, api_key))
    }
}

/// Strips the API key query parameter before a URL lands in an error.
fn redact_key(url: &str) -> String {
    match url.split_once("&key=") {
        Some((prefix, _)) => format!("{prefix}&key=<redacted>"),
        None => url.to_owned(),
    }
}

/// Converts a provider envelope into kilometre/minute matrices.
///
/// Per-element failures become `f64::NAN` so sanitization replaces them
/// with the distance sentinel; only request-level failures error.
fn convert_response(
    envelope: &DistanceMatrixResponse,
    expected: usize,
) -> Result<ProviderMatrices, ProviderError> {
    if !envelope.is_ok() {
        return Err(ProviderError::Service {
            status: envelope.status.clone(),
            message: envelope.error_message.clone().unwrap_or_default(),
        });
    }
    if envelope.rows.len() != expected {
        return Err(ProviderError::Parse {
            message: format!("expected {expected} rows, got {}", envelope.rows.len()),
        });
    }

    let mut distance = SquareMatrix::zeros(expected);
    let mut time = SquareMatrix::zeros(expected);
    for (row_index, row) in envelope.rows.iter().enumerate() {
        if row.elements.len() != expected {
            return Err(ProviderError::Parse {
                message: format!(
                    "row {row_index} has {} elements, expected {expected}",
                    row.elements.len()
                ),
            });
        }
        for (col_index, element) in row.elements.iter().enumerate() {
            match element.values() {
                Some((metres, seconds)) => {
                    distance.set(row_index, col_index, metres / 1000.0);
                    time.set(row_index, col_index, seconds / 60.0);
                }
                None => {
                    log::warn!(
                        "provider reported pair ({row_index}, {col_index}) unroutable: {}",
                        element.status
                    );
                    distance.set(row_index, col_index, f64::NAN);
                    time.set(row_index, col_index, f64::NAN);
                }
            }
        }
    }

    Ok(ProviderMatrices { distance, time })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn locations() -> Vec<Location> {
        vec![
            Location::new("a", 51.5, -0.1).unwrap(),
            Location::new("b", 51.6, -0.2).unwrap(),
        ]
    }

    #[rstest]
    fn build_url_joins_coordinates(locations: Vec<Location>) {
        let provider = GoogleMatrixProvider::with_config(
            GoogleMatrixProviderConfig::default().with_base_url("http://stub.local/"),
        )
        .unwrap();

        let url = provider.build_url(&locations, "secret");

        assert_eq!(
            url,
            "http://stub.local/maps/api/distancematrix/json\
             ?origins=51.50000,-0.10000|51.60000,-0.20000\
             &destinations=51.50000,-0.10000|51.60000,-0.20000&key=secret"
        );
    }

    #[rstest]
    fn redacts_key_in_errors() {
        assert_eq!(
            redact_key("http://x/json?origins=1,1&destinations=2,2&key=secret"),
            "http://x/json?origins=1,1&destinations=2,2&key=<redacted>"
        );
    }

    #[rstest]
    fn convert_response_scales_units() {
        let envelope: DistanceMatrixResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "rows": [
                    {"elements": [
                        {"status": "OK", "distance": {"value": 0}, "duration": {"value": 0}},
                        {"status": "OK", "distance": {"value": 1500}, "duration": {"value": 90}}
                    ]},
                    {"elements": [
                        {"status": "OK", "distance": {"value": 1500}, "duration": {"value": 90}},
                        {"status": "OK", "distance": {"value": 0}, "duration": {"value": 0}}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        let matrices = convert_response(&envelope, 2).unwrap();

        assert_eq!(matrices.distance.get(0, 1), 1.5);
        assert_eq!(matrices.time.get(0, 1), 1.5);
    }

    #[rstest]
    fn convert_response_marks_unroutable_pairs() {
        let envelope: DistanceMatrixResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]
            }"#,
        )
        .unwrap();

        let matrices = convert_response(&envelope, 1).unwrap();

        assert!(matrices.distance.get(0, 0).is_nan());
    }

    #[rstest]
    fn convert_response_rejects_service_failure() {
        let envelope: DistanceMatrixResponse = serde_json::from_str(
            r#"{"status": "OVER_QUERY_LIMIT", "error_message": "slow down"}"#,
        )
        .unwrap();

        let err = convert_response(&envelope, 1).unwrap_err();

        assert!(matches!(err, ProviderError::Service { .. }));
    }

    #[rstest]
    fn convert_response_rejects_ragged_rows() {
        let envelope: DistanceMatrixResponse = serde_json::from_str(
            r#"{"status": "OK", "rows": [{"elements": []}]}"#,
        )
        .unwrap();

        let err = convert_response(&envelope, 1).unwrap_err();

        assert!(matches!(err, ProviderError::Parse { .. }));
    }
}
