//! Error types for the Lumen engine
//!
//! This module defines the error types used by the device layer, the
//! shader variant cache and the render queues.

use std::fmt;

/// Result type for Lumen engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error reported by the graphics device
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, descriptor slot, template, submodel, etc.)
    InvalidResource(String),

    /// Initialization failed (device, program library, queues)
    InitializationFailed(String),

    /// A configured limit was exceeded (template ids, macro bit budget)
    LimitExceeded(String),

    /// Operation not allowed on this object
    InvalidOperation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::LimitExceeded(msg) => write!(f, "Limit exceeded: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
