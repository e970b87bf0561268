//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success
//! - `1`: General error
//! - `2`: Invalid input, nothing was changed
//! - `3`: Item or embedding source not found
//! - `4`: Index storage unavailable
//! - `5`: Configuration error

use crate::error::{ErrorKind, IndexError};

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Request rejected by validation (code 2)
    InvalidInput = 2,

    /// Item not found or not embeddable (code 3)
    NotFound = 3,

    /// Index storage could not be read or written (code 4)
    Unavailable = 4,

    /// Configuration error (code 5)
    ConfigError = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl ExitCode {
    /// Convert an `IndexError` to the appropriate exit code.
    pub fn from_error(error: &IndexError) -> Self {
        match error.kind() {
            ErrorKind::InvalidInput => ExitCode::InvalidInput,
            ErrorKind::NotFound => ExitCode::NotFound,
            ErrorKind::Unavailable => ExitCode::Unavailable,
            ErrorKind::Configuration => ExitCode::ConfigError,
            ErrorKind::Embedding => ExitCode::GeneralError,
        }
    }

    /// Check if this exit code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::InvalidInput => "Invalid input",
            ExitCode::NotFound => "Not found",
            ExitCode::Unavailable => "Index storage unavailable",
            ExitCode::ConfigError => "Configuration error",
        }
    }
}
