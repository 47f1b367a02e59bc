//! # MineSense Core
//!
//! Core types, error taxonomy and shared numerics for the MineSense
//! multi-modal mining hardware detection engine.
//!
//! - **Input Types**: [`SampleBuffer`], [`ThermalGrid`], [`PowerReading`] and
//!   [`NetworkObservation`] as handed over by the sensor acquisition layer.
//! - **Error Types**: [`CoreError`] for structurally invalid input and
//!   [`DegenerateDataWarning`] for inputs that carry no usable signal.
//! - **Statistics**: total (NaN-free) descriptive statistics in [`utils`].
//! - **Spatial**: DBSCAN in [`spatial`], all-pairs and grid-windowed.
//!
//! ## Example
//!
//! ```rust
//! use minesense_core::{SampleBuffer, ThermalGrid};
//!
//! let buffer = SampleBuffer::new(vec![0.0; 1024], 44_100).unwrap();
//! assert!(buffer.is_all_zero());
//!
//! let grid = ThermalGrid::filled(240, 320, 25.0).unwrap();
//! assert_eq!(grid.cols(), 320);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod spatial;
pub mod types;
pub mod utils;

pub use error::{CoreError, CoreResult, DegenerateDataWarning, DegenerateReason};
pub use types::{
    GeoLocation, Modality, NetworkObservation, PowerReading, SampleBuffer, ThermalGrid,
    ThermalMetadata,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult, DegenerateDataWarning, DegenerateReason};
    pub use crate::types::{
        GeoLocation, Modality, NetworkObservation, PowerReading, SampleBuffer, ThermalGrid,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
