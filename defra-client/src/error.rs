/// Error types for the DefraDB client
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum ClientError {
    /// A composable address lacks the IPv4/TCP segments an RPC channel needs,
    /// or is not a valid multiaddr at all.
    #[error("Address format error: {0}")]
    AddressFormat(String),

    /// A peer identifier is not valid base-58.
    #[error("Identifier format error: {0}")]
    IdentifierFormat(String),

    /// Transport failure or remote-reported error on the GraphQL channel.
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// The node rejected a schema for a reason other than "already exists".
    #[error("Schema load error: {message}")]
    SchemaLoad {
        message: String,
        /// The first offending error object, verbatim.
        error: serde_json::Value,
    },

    /// RPC-level failure on a replicator operation.
    #[error("Replication error ({code:?}): {message}")]
    Replication { code: tonic::Code, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A request rejected before anything was sent to the node.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::AddressFormat(_) => "ADDRESS_FORMAT",
            ClientError::IdentifierFormat(_) => "IDENTIFIER_FORMAT",
            ClientError::QueryExecution(_) => "QUERY_EXECUTION",
            ClientError::SchemaLoad { .. } => "SCHEMA_LOAD",
            ClientError::Replication { .. } => "REPLICATION",
            ClientError::InvalidConfig(_) => "INVALID_CONFIG",
            ClientError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Returns true if a caller may reasonably retry the call.
    ///
    /// The client never retries on its own; this only classifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Replication { code, .. } => is_transport_code(*code),
            ClientError::QueryExecution(_)
            | ClientError::AddressFormat(_)
            | ClientError::IdentifierFormat(_)
            | ClientError::SchemaLoad { .. }
            | ClientError::InvalidConfig(_)
            | ClientError::InvalidRequest(_) => false,
        }
    }

    /// A malformed reply from the node.
    pub(crate) fn replication(message: impl Into<String>) -> Self {
        ClientError::Replication {
            code: tonic::Code::Internal,
            message: message.into(),
        }
    }
}

/// Status codes that indicate a broken or overloaded channel rather than a
/// rejected request.
pub(crate) fn is_transport_code(code: tonic::Code) -> bool {
    matches!(
        code,
        tonic::Code::Unavailable
            | tonic::Code::Unknown
            | tonic::Code::Cancelled
            | tonic::Code::DeadlineExceeded
    )
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Convert gRPC Status to ClientError
impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        ClientError::Replication {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::QueryExecution(format!("request timed out: {}", err))
        } else if err.is_decode() {
            ClientError::QueryExecution(format!("malformed response: {}", err))
        } else {
            ClientError::QueryExecution(err.to_string())
        }
    }
}
