//! # MineSense Detect
//!
//! Multi-modal signature detection and confidence fusion for unauthorized
//! cryptocurrency mining hardware.
//!
//! ## Features
//!
//! - **Signature Catalogue**: validated, swappable table of per-modality device
//!   fingerprints (frequencies, temperature ranges, wattage envelopes, ports)
//! - **Modality Matchers**: acoustic, RF, thermal, power and network scoring
//!   with table-driven named pattern detectors
//! - **Confidence Fusion**: additive capped fusion of modality scores and
//!   thermal findings, with severity classification
//! - **Hotspot Clustering**: DBSCAN over georeferenced detections
//! - **Worker Pool**: parallel batch scanning on a fixed rayon pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use minesense_core::{GeoLocation, ThermalGrid};
//! use minesense_detect::{
//!     DetectionConfig, ScanPipeline, ScanRequest, SignatureCatalogue,
//! };
//!
//! let config = DetectionConfig::builder()
//!     .severity_thresholds(0.5, 0.8)
//!     .worker_threads(4)
//!     .build();
//!
//! let pipeline = ScanPipeline::new(Arc::new(SignatureCatalogue::builtin()), config)?;
//!
//! let request = ScanRequest::new()
//!     .with_location(GeoLocation::new(47.37, 8.54)?)
//!     .with_thermal(ThermalGrid::filled(240, 320, 25.0)?);
//!
//! let result = pipeline.scan(&request)?;
//! println!("confidence {} ({})", result.overall_confidence, result.severity);
//! # Ok::<(), minesense_detect::DetectError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalogue;
pub mod clustering;
pub mod domain;
pub mod fusion;
pub mod matchers;
pub mod pipeline;
pub mod scheduler;

use minesense_core::CoreError;
use minesense_signal::{PeakDetectionConfig, SignalError, ThermalAnalyzerConfig};
use serde::{Deserialize, Serialize};

// Re-export main types
pub use catalogue::{CatalogueError, CatalogueHandle, DeviceSignature, SignatureCatalogue, WattageRange};
pub use clustering::{ClusterConfig, DistanceMetric, SpatialClusterAnalyzer};
pub use domain::{Cluster, ClusterReport, DetectionId, DetectionResult, ModalityScore, Severity};
pub use fusion::{ConfidenceFusion, FusionWeights, SeverityThresholds};
pub use matchers::{
    FrequencyMatcher, FrequencyPattern, MatcherConfig, ModalityMatcher, NetworkMatcher,
    PowerMatcher, PowerPattern, ThermalMatcher,
};
pub use pipeline::{ScanPipeline, ScanRequest};
pub use scheduler::ScanScheduler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type for detection operations
pub type Result<T> = std::result::Result<T, DetectError>;

/// Error types for detection operations
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// Feature extraction error
    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    /// Invalid input data
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Catalogue rejected
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// Malformed catalogue or configuration document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool could not be started
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl DetectError {
    /// Returns `true` for errors caused by structurally invalid scan input.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::Signal(e) => e.is_invalid_input(),
            Self::Core(e) => e.is_invalid_input(),
            _ => false,
        }
    }
}

/// Configuration for the detection engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Spectral peak picking thresholds
    pub peak_detection: PeakDetectionConfig,
    /// Thermal analyzer settings
    pub thermal: ThermalAnalyzerConfig,
    /// Matcher tolerances and increments
    pub matcher: MatcherConfig,
    /// Fusion weights
    pub fusion: FusionWeights,
    /// Severity cut points
    pub severity: SeverityThresholds,
    /// Hotspot clustering parameters
    pub clustering: ClusterConfig,
    /// Worker threads for batch scans (0 = one per core)
    pub worker_threads: usize,
}

impl DetectionConfig {
    /// Create a new configuration builder
    pub fn builder() -> DetectionConfigBuilder {
        DetectionConfigBuilder::default()
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.peak_detection.validate()?;
        self.thermal.validate()?;
        self.matcher.validate()?;
        self.severity.validate()?;
        if !(self.clustering.epsilon > 0.0) {
            return Err(DetectError::Config(format!(
                "cluster epsilon must be positive, got {}",
                self.clustering.epsilon
            )));
        }
        Ok(())
    }
}

/// Builder for [`DetectionConfig`]
#[derive(Debug, Default)]
pub struct DetectionConfigBuilder {
    config: DetectionConfig,
}

impl DetectionConfigBuilder {
    /// Set spectral peak thresholds (relative to the strongest bin)
    pub fn peak_thresholds(mut self, min_relative_height: f64, min_relative_prominence: f64) -> Self {
        self.config.peak_detection = PeakDetectionConfig {
            min_relative_height: min_relative_height.clamp(0.0, 1.0),
            min_relative_prominence: min_relative_prominence.clamp(0.0, 1.0),
        };
        self
    }

    /// Set thermal analyzer configuration
    pub fn thermal(mut self, config: ThermalAnalyzerConfig) -> Self {
        self.config.thermal = config;
        self
    }

    /// Set matcher configuration
    pub fn matcher(mut self, config: MatcherConfig) -> Self {
        self.config.matcher = config;
        self
    }

    /// Set acoustic and RF frequency tolerances
    pub fn frequency_tolerances(mut self, acoustic: f64, rf: f64) -> Self {
        self.config.matcher.acoustic_tolerance = acoustic.clamp(1e-6, 0.5);
        self.config.matcher.rf_tolerance = rf.clamp(1e-6, 0.5);
        self
    }

    /// Set fusion weights
    pub fn fusion(mut self, weights: FusionWeights) -> Self {
        self.config.fusion = weights;
        self
    }

    /// Set severity cut points
    pub fn severity_thresholds(mut self, medium: f64, high: f64) -> Self {
        let medium = medium.clamp(0.0, 1.0);
        self.config.severity = SeverityThresholds {
            medium,
            high: high.clamp(medium, 1.0),
        };
        self
    }

    /// Set hotspot clustering parameters
    pub fn clustering(mut self, epsilon: f64, min_points: usize, metric: DistanceMetric) -> Self {
        self.config.clustering = ClusterConfig {
            epsilon: epsilon.max(f64::MIN_POSITIVE),
            min_points: min_points.max(1),
            metric,
        };
        self
    }

    /// Set worker thread count
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = threads;
        self
    }

    /// Build the configuration
    pub fn build(self) -> DetectionConfig {
        self.config
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CatalogueHandle, Cluster, ClusterReport, ConfidenceFusion, DetectError, DetectionConfig,
        DetectionConfigBuilder, DetectionId, DetectionResult, DeviceSignature, DistanceMetric,
        ModalityMatcher, ModalityScore, Result, ScanPipeline, ScanRequest, ScanScheduler,
        Severity, SignatureCatalogue, SpatialClusterAnalyzer,
    };
    pub use minesense_core::prelude::*;
}
