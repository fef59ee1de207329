use thiserror::Error;

/// The error taxonomy from the spec: validation failures are client mistakes
/// (bad SQL, unknown column/table/db, type mismatch), data-access failures
/// are server-side (missing file, header mismatch, I/O). Per-row conversion
/// failures never surface here — the Scan iterator swallows those.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DataAccess(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn data_access(msg: impl Into<String>) -> Self {
        EngineError::DataAccess(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub fn message(&self) -> &str {
        match self {
            EngineError::Validation(m) | EngineError::DataAccess(m) => m,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
