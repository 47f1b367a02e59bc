//! MineSense Signal Processing Library
//!
//! Feature extraction for the physical modalities used to spot mining hardware.
//!
//! # Features
//!
//! - **Spectral Extraction**: DFT magnitude spectrum and prominence-filtered
//!   peak picking for acoustic and RF captures
//! - **Thermal Analysis**: statistics, gradients, hot spots, clustered
//!   anomalies, straight-line structures and distribution shape of a thermal frame
//! - **Thermal Patterns**: named detectors (`gpu_cluster`, `asic_array`, ...)
//!   referenced by thermal signatures
//!
//! # Example
//!
//! ```rust
//! use minesense_core::{SampleBuffer, ThermalGrid};
//! use minesense_signal::{SpectralExtractor, ThermalAnalyzer};
//!
//! let samples: Vec<f64> = (0..8000)
//!     .map(|i| (2.0 * std::f64::consts::PI * 100.0 * i as f64 / 8000.0).sin())
//!     .collect();
//! let buffer = SampleBuffer::new(samples, 8000).unwrap();
//! let features = SpectralExtractor::default().extract(&buffer).unwrap();
//! assert!(!features.is_empty());
//!
//! let grid = ThermalGrid::filled(32, 32, 25.0).unwrap();
//! let analysis = ThermalAnalyzer::default().analyze(&grid).unwrap();
//! assert_eq!(analysis.hot_spots.count, 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod spectral;
pub mod thermal;

use minesense_core::CoreError;

// Re-export main types for convenience
pub use spectral::{
    extract_peaks, PeakDetectionConfig, SpectralExtractor, SpectralFeatures, SpectralPeak,
};
pub use thermal::{
    AnomalyCluster, AnomalySeverity, DistributionAnalysis, GradientStats, HotSpotStats,
    LinearPattern, ThermalAnalysis, ThermalAnalyzer, ThermalAnalyzerConfig,
    ThermalAnalyzerConfigBuilder, ThermalAnomalies, ThermalPattern, ThermalStats,
    ThermalSummary,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for signal processing operations
pub type Result<T> = std::result::Result<T, SignalError>;

/// Unified error type for signal processing operations
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Invalid input rejected by a core constructor
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Buffer too short to transform
    #[error("Buffer too short: {len} samples, need at least {min}")]
    BufferTooShort {
        /// Actual length
        len: usize,
        /// Required length
        min: usize,
    },

    /// Thermal grid cannot be analyzed
    #[error("Invalid thermal grid: {0}")]
    InvalidGrid(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SignalError {
    /// Returns `true` for errors caused by structurally invalid input data.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::Core(e) => e.is_invalid_input(),
            Self::BufferTooShort { .. } | Self::InvalidGrid(_) => true,
            Self::InvalidConfig(_) => false,
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::spectral::{PeakDetectionConfig, SpectralExtractor, SpectralFeatures, SpectralPeak};
    pub use crate::thermal::{ThermalAnalysis, ThermalAnalyzer, ThermalAnalyzerConfig, ThermalPattern};
    pub use crate::{Result, SignalError};
}
