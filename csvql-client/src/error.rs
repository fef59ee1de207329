//! Error taxonomy for the client driver. Rust has no exception hierarchy to
//! mirror the original `dbapi2`'s `Error`/`DatabaseError`/`ProgrammingError`
//! chain 1:1, so this collapses it to one enum — callers that want to
//! branch on "my fault" vs "server's fault" still can, via the variant.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid DSN: {0}")]
    InvalidDsn(String),

    /// A 4xx response: bad SQL, unknown db, or bad credentials.
    #[error("{0}")]
    ProgrammingError(String),

    /// A 5xx response or a network/transport failure.
    #[error("{0}")]
    DatabaseError(String),

    /// A malformed NDJSON stream line.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::DatabaseError(e.to_string())
    }
}
