use std::fmt;

use adsplat_store::StoreError;
use thiserror::Error;

/// Failures of the remote-call capability itself.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend responded with status {0} and no body")]
    Status(u16),

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

}

/// Why a transport call produced only an empty default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The remote-call capability is not wired up.
    EnvironmentUnavailable,
    /// No session token, or the backend answered 401.
    Unauthorized,
    /// A list endpoint answered with a non-200 envelope.
    Application,
    /// The reply was not valid JSON or had the wrong shape.
    Decode,
    /// The call itself failed.
    Transport,
    /// The backend does not know the endpoint.
    UnknownEndpoint,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Failure::EnvironmentUnavailable => "environment unavailable",
            Failure::Unauthorized => "unauthorized",
            Failure::Application => "application error",
            Failure::Decode => "decode failure",
            Failure::Transport => "transport failure",
            Failure::UnknownEndpoint => "unknown endpoint",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by cache loaders and console operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{endpoint} returned no data: {failure}")]
    NoData {
        endpoint: &'static str,
        failure: Failure,
    },

    #[error("Unexpected reply shape from {0}")]
    UnexpectedShape(&'static str),

    #[error("No server data available")]
    NoServerData,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
