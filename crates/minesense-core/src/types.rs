//! Input data types consumed by the detection engine.
//!
//! These are the structures handed over by the sensor acquisition layer. All of
//! them are immutable once constructed and validate their shape on creation, so
//! downstream analysis never has to re-check for NaN samples or ragged grids.
//!
//! # Type Categories
//!
//! - **Signal Types**: [`SampleBuffer`] (acoustic and RF), [`ThermalGrid`]
//! - **Scalar Readings**: [`PowerReading`], [`NetworkObservation`]
//! - **Common Types**: [`Modality`], [`GeoLocation`]

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Common Types
// =============================================================================

/// One physical sensing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Acoustic emissions (fans, coil whine, PSU hum)
    Acoustic,
    /// Radio-frequency spectrum
    Rf,
    /// Thermal imagery
    Thermal,
    /// Electrical power draw
    Power,
    /// Network port and service fingerprints
    Network,
}

impl Modality {
    /// All modalities in canonical order.
    pub const ALL: [Modality; 5] = [
        Modality::Acoustic,
        Modality::Rf,
        Modality::Thermal,
        Modality::Power,
        Modality::Network,
    ];

    /// Returns the lowercase name of the modality.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Acoustic => "acoustic",
            Modality::Rf => "rf",
            Modality::Thermal => "thermal",
            Modality::Power => "power",
            Modality::Network => "network",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A georeferenced position.
///
/// Coordinates are only required to be finite. With the haversine metric they
/// are interpreted as WGS84 degrees; with the planar metric they are treated
/// as plain Cartesian units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude (or planar y)
    pub latitude: f64,
    /// Longitude (or planar x)
    pub longitude: f64,
}

impl GeoLocation {
    /// Creates a new location, rejecting non-finite coordinates.
    pub fn new(latitude: f64, longitude: f64) -> CoreResult<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoreError::invalid_input(format!(
                "location ({latitude}, {longitude}) is not finite"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Converts to a `geo` point (x = longitude, y = latitude).
    #[must_use]
    pub fn to_point(&self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

impl From<geo::Point<f64>> for GeoLocation {
    fn from(point: geo::Point<f64>) -> Self {
        Self {
            latitude: point.y(),
            longitude: point.x(),
        }
    }
}

// =============================================================================
// Signal Types
// =============================================================================

/// A digitised acoustic or RF capture.
///
/// RF captures digitised at baseband carry the tuner's center frequency so that
/// extracted bin frequencies land on absolute RF frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
    center_frequency: f64,
}

impl SampleBuffer {
    /// Creates a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if the sample rate is zero or any
    /// sample is NaN or infinite.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> CoreResult<Self> {
        if sample_rate == 0 {
            return Err(CoreError::invalid_input("sample rate must be positive"));
        }
        if let Some(idx) = samples.iter().position(|s| !s.is_finite()) {
            return Err(CoreError::invalid_input(format!(
                "sample {idx} is not finite"
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            center_frequency: 0.0,
        })
    }

    /// Sets the center frequency (Hz) of a baseband RF capture.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if the frequency is negative or not finite.
    pub fn with_center_frequency(mut self, center_frequency: f64) -> CoreResult<Self> {
        if !center_frequency.is_finite() || center_frequency < 0.0 {
            return Err(CoreError::invalid_input(format!(
                "center frequency {center_frequency} must be finite and non-negative"
            )));
        }
        self.center_frequency = center_frequency;
        Ok(self)
    }

    /// Returns the samples.
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Returns the sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the center frequency offset in Hz (0 for acoustic captures).
    #[must_use]
    pub fn center_frequency(&self) -> f64 {
        self.center_frequency
    }

    /// Returns the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the buffer holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns `true` if every sample is exactly zero.
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }

    /// Returns the capture duration in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Acquisition metadata attached to a thermal frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalMetadata {
    /// When the frame was captured
    pub captured_at: DateTime<Utc>,
    /// Camera identifier, if known
    pub sensor_id: Option<String>,
    /// Emissivity setting used by the camera
    pub emissivity: Option<f64>,
}

impl Default for ThermalMetadata {
    fn default() -> Self {
        Self {
            captured_at: Utc::now(),
            sensor_id: None,
            emissivity: None,
        }
    }
}

/// A 2-D temperature frame in degrees Celsius (rows × cols).
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalGrid {
    values: Array2<f64>,
    metadata: ThermalMetadata,
}

impl ThermalGrid {
    /// Creates a grid from a temperature matrix.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if the matrix is empty or contains
    /// non-finite values.
    pub fn new(values: Array2<f64>) -> CoreResult<Self> {
        if values.is_empty() {
            return Err(CoreError::invalid_input("thermal grid has no cells"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::invalid_input(
                "thermal grid contains non-finite temperatures",
            ));
        }
        Ok(Self {
            values,
            metadata: ThermalMetadata::default(),
        })
    }

    /// Creates a grid from row vectors.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for empty or ragged rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> CoreResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return Err(CoreError::invalid_input("thermal grid rows are ragged"));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((height, width), flat)
            .map_err(|e| CoreError::invalid_input(format!("thermal grid shape: {e}")))?;
        Self::new(values)
    }

    /// Creates a uniform grid.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for zero dimensions or a non-finite value.
    pub fn filled(rows: usize, cols: usize, value: f64) -> CoreResult<Self> {
        Self::new(Array2::from_elem((rows, cols), value))
    }

    /// Attaches acquisition metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ThermalMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the temperature matrix.
    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Returns the acquisition metadata.
    #[must_use]
    pub fn metadata(&self) -> &ThermalMetadata {
        &self.metadata
    }

    /// Number of rows (grid height).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns (grid width).
    #[must_use]
    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; empty grids are rejected on construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Scalar Readings
// =============================================================================

/// Power draw measured at a circuit or outlet, in watts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    /// Instantaneous draw
    pub instantaneous: f64,
    /// Peak draw over the observation window
    pub peak: f64,
    /// Average draw over the observation window
    pub average: f64,
    /// Optional evenly spaced draw samples
    #[serde(default)]
    pub samples: Vec<f64>,
    /// Spacing of `samples` in seconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: f64,
}

fn default_sample_interval() -> f64 {
    1.0
}

impl PowerReading {
    /// Creates a reading without a time series.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for negative or non-finite values.
    pub fn new(instantaneous: f64, peak: f64, average: f64) -> CoreResult<Self> {
        for (name, value) in [
            ("instantaneous", instantaneous),
            ("peak", peak),
            ("average", average),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::invalid_input(format!(
                    "{name} power {value} must be finite and non-negative"
                )));
            }
        }
        Ok(Self {
            instantaneous,
            peak,
            average,
            samples: Vec::new(),
            sample_interval_secs: default_sample_interval(),
        })
    }

    /// Attaches a draw time series.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for a non-positive interval or
    /// negative/non-finite samples.
    pub fn with_series(mut self, samples: Vec<f64>, sample_interval_secs: f64) -> CoreResult<Self> {
        if !sample_interval_secs.is_finite() || sample_interval_secs <= 0.0 {
            return Err(CoreError::invalid_input(
                "power sample interval must be positive",
            ));
        }
        if samples.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(CoreError::invalid_input(
                "power samples must be finite and non-negative",
            ));
        }
        self.samples = samples;
        self.sample_interval_secs = sample_interval_secs;
        Ok(self)
    }
}

/// Open ports and service banners observed on a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkObservation {
    /// Open TCP ports
    pub open_ports: Vec<u16>,
    /// Service names or banners reported by the scanner
    pub services: Vec<String>,
}

impl NetworkObservation {
    /// Creates a new observation.
    #[must_use]
    pub fn new(open_ports: Vec<u16>, services: Vec<String>) -> Self {
        Self {
            open_ports,
            services,
        }
    }

    /// Returns `true` if nothing was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open_ports.is_empty() && self.services.is_empty()
    }
}
