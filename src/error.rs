//! Error types shared across the server.

use std::path::PathBuf;

use thiserror::Error;
use tower_lsp::jsonrpc;

/// Failure while reading one configuration artifact.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Missing or unreadable settings and tables. Aborts the parse that hit it.
///
/// The display strings are what the client sees as the single diagnostic of
/// an aborted parse, so they are kept stable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("ERROR: Couldn't read .ncsetting file")]
    Settings(#[source] TableError),
    #[error("ERROR: Couldn't read word grammar settings")]
    WordGrammar(#[source] TableError),
    #[error("ERROR: Couldn't read gcode groups settings")]
    GCodeGroups(#[source] TableError),
    #[error("ERROR: Couldn't read mcode groups settings")]
    MCodeGroups(#[source] TableError),
    #[error("ERROR: Exactly one processing mode must be selected")]
    InvalidMode { selected: usize },
    #[error("ERROR: Unknown dialect '{0}'")]
    UnknownDialect(String),
}

/// A request that cannot be served in the current server state.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("server not initialized")]
    NotInitialized,
    #[error("server is shutting down")]
    ShuttingDown,
    #[error("server already initialized")]
    AlreadyInitialized,
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

impl From<ProtocolError> for jsonrpc::Error {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::NotInitialized => jsonrpc::Error {
                code: jsonrpc::ErrorCode::ServerError(-32002),
                message: err.to_string().into(),
                data: None,
            },
            ProtocolError::InvalidParams(_) => jsonrpc::Error::invalid_params(err.to_string()),
            ProtocolError::ShuttingDown | ProtocolError::AlreadyInitialized => jsonrpc::Error {
                code: jsonrpc::ErrorCode::InvalidRequest,
                message: err.to_string().into(),
                data: None,
            },
        }
    }
}
