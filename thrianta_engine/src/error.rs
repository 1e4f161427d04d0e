//! Error types for the Thrianta engine
//!
//! This module defines the error type used throughout the engine,
//! including device selection, swapchain management, frame submission
//! and resource creation.

use std::fmt;

/// Result type for Thrianta engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Thrianta engine errors
///
/// Every variant is fatal for the renderer: transient conditions such as an
/// out-of-date swapchain or a minimized window are reported as skipped
/// frames, never as errors.
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan result code and call site in the message)
    BackendError(String),

    /// Out of host or GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, shader module, memory type, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, render pass, etc.)
    InitializationFailed(String),

    /// No physical device satisfies the renderer requirements
    NoSuitableDevice,

    /// The logical device was lost (driver reset, hang, removal)
    DeviceLost(String),

    /// An internal state-machine invariant was violated
    InvalidState(String),

    /// File system error (shader bytecode loading)
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::NoSuitableDevice => write!(f, "No suitable GPU device found"),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
