//! Error types emitted by the Routeflow CLI.

use camino::Utf8PathBuf;
use routeflow_engine::InvalidInput;
use thiserror::Error;

/// Errors emitted by the Routeflow CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Opening the request file failed.
    #[error("failed to open request at {path}: {source}")]
    OpenRequest {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Request JSON could not be decoded.
    #[error("failed to parse request JSON at {path}: {source}")]
    ParseRequest {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The request payload failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidInput),
    /// A delay reroute arrived without its delay payload.
    #[error("reroute type {reroute_type} is missing required field {field}")]
    MissingReroutePayload {
        reroute_type: &'static str,
        field: &'static str,
    },
    /// Serialising the solution failed.
    #[error("failed to serialise solution: {0}")]
    SerialiseSolution(#[source] serde_json::Error),
    /// Writing the output file failed.
    #[error("failed to write output to {path}: {source}")]
    WriteOutput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
