use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid configuration mapping")]
    InvalidConfig(#[from] serde_json::Error),
    #[error("unrecognized protocol version: {0}")]
    UnrecognizedProtocolVersion(String),
    #[error("session already started, cookie parameters can no longer change")]
    SessionAlreadyStarted,
    #[error("logout request from unauthorized host: {host}")]
    UnauthorizedLogoutSource { host: String },
    #[error("method not supported by the protocol engine: {method}")]
    MethodNotSupported { method: String },
    #[error("no authenticated user")]
    NotAuthenticated,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
