//! Classification of model capability failures.
//!
//! The bridge never inspects engine internals; it classifies by the failure
//! message alone. An exhaustion signature maps to `OUT_OF_MEMORY`, anything
//! else is a generic engine failure. Keeping this a pure function of the
//! message lets it be tested without loading any model.

use crate::protocol::ErrorCode;
use thiserror::Error;

/// A failure from a model capability invocation, already classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{0}")]
    OutOfMemory(String),
    #[error("{0}")]
    Engine(String),
}

impl EngineError {
    /// Classify a backend failure message. The exhaustion check is
    /// case-insensitive so `CUDA out of memory`, `MPS Out Of Memory` and
    /// friends all land in the same bucket.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("out of memory") {
            EngineError::OutOfMemory(message)
        } else {
            EngineError::Engine(message)
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::OutOfMemory(_) => ErrorCode::OutOfMemory,
            EngineError::Engine(_) => ErrorCode::EngineError,
        }
    }

    /// The underlying message, carried to the wire verbatim.
    pub fn message(&self) -> &str {
        match self {
            EngineError::OutOfMemory(message) | EngineError::Engine(message) => message,
        }
    }
}
