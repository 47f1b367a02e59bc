//! Error types for the MineSense detection engine.
//!
//! Errors are reserved for structurally invalid input (wrong shapes, too-short
//! buffers, non-finite samples). Inputs that are well-formed but carry no
//! usable signal, such as silence or a thermally flat scene, are not errors:
//! they produce zero scores and a [`DegenerateDataWarning`] value.
//!
//! # Example
//!
//! ```rust
//! use minesense_core::error::{CoreError, CoreResult};
//!
//! fn check_rate(rate: u32) -> CoreResult<u32> {
//!     if rate == 0 {
//!         return Err(CoreError::invalid_input("sample rate must be positive"));
//!     }
//!     Ok(rate)
//! }
//!
//! assert!(check_rate(0).unwrap_err().is_invalid_input());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Modality;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error type for input validation and configuration.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CoreError {
    /// Malformed or too-short input. Not retried; the caller must re-acquire.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what was wrong with the input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },
}

impl CoreError {
    /// Creates a new invalid-input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this error was caused by malformed input.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

/// Why an input was considered degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    /// The input contained no samples or cells.
    Empty,
    /// Every sample was zero.
    AllZero,
    /// The input had no variance (e.g. a uniform thermal grid).
    ZeroVariance,
}

impl std::fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::AllZero => write!(f, "all zero"),
            Self::ZeroVariance => write!(f, "zero variance"),
        }
    }
}

/// Non-fatal notice that a modality's input carried no usable signal.
///
/// The affected modality contributes a zero score; the scan still succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenerateDataWarning {
    /// Modality whose input was degenerate
    pub modality: Modality,
    /// What made it degenerate
    pub reason: DegenerateReason,
}

impl DegenerateDataWarning {
    /// Creates a new warning.
    #[must_use]
    pub fn new(modality: Modality, reason: DegenerateReason) -> Self {
        Self { modality, reason }
    }
}

impl std::fmt::Display for DegenerateDataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} input is degenerate ({})", self.modality, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_input("buffer length 1 is below 2");
        assert_eq!(err.to_string(), "Invalid input: buffer length 1 is below 2");
        assert!(err.is_invalid_input());

        let err = CoreError::configuration("epsilon must be positive");
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_warning_display() {
        let warning = DegenerateDataWarning::new(Modality::Thermal, DegenerateReason::ZeroVariance);
        assert_eq!(warning.to_string(), "thermal input is degenerate (zero variance)");
    }
}
