//! Signature catalogue of known mining hardware.
//!
//! A catalogue is validated once on construction and never mutated. Reloading
//! means building a new catalogue and swapping it into a [`CatalogueHandle`],
//! so concurrent scans always see one complete table.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use minesense_core::Modality;
use minesense_signal::ThermalPattern;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::matchers::frequency::FrequencyPattern;
use crate::matchers::network::is_known_service_keyword;
use crate::matchers::power::PowerPattern;
use crate::Result;

/// Reasons a catalogue is rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogueError {
    /// A signature violates a field invariant
    #[error("Invalid {modality} signature for '{device_class}': {reason}")]
    InvalidSignature {
        /// Device class of the offending record
        device_class: String,
        /// Modality of the offending record
        modality: Modality,
        /// What is wrong
        reason: String,
    },

    /// A signature names a pattern that has no detector
    #[error("Unknown {modality} pattern '{pattern}' in signature for '{device_class}'")]
    UnknownPattern {
        /// Device class of the offending record
        device_class: String,
        /// Modality of the offending record
        modality: Modality,
        /// The unknown pattern name
        pattern: String,
    },

    /// The catalogue holds no signatures
    #[error("Signature catalogue is empty")]
    Empty,
}

/// Power envelope of a device class, in watts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WattageRange {
    /// Upper bound of ordinary (non-mining) consumption
    pub normal_max: f64,
    /// Upper bound of mining consumption
    pub mining_max: f64,
}

impl WattageRange {
    /// Creates a range.
    pub fn new(normal_max: f64, mining_max: f64) -> Self {
        Self {
            normal_max,
            mining_max,
        }
    }

    /// Position of `watts` between the two bounds, clamped to [0, 1].
    pub fn interpolate(&self, watts: f64) -> f64 {
        let span = self.mining_max - self.normal_max;
        if !(span > 0.0) || !watts.is_finite() {
            return 0.0;
        }
        ((watts - self.normal_max) / span).clamp(0.0, 1.0)
    }
}

/// Fingerprint of one device class on one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSignature {
    /// Device class, e.g. `bitcoin`
    pub device_class: String,
    /// Modality the fingerprint applies to
    pub modality: Modality,
    /// Characteristic frequencies in Hz (acoustic and RF)
    #[serde(default)]
    pub frequencies: Vec<f64>,
    /// Operating temperature range in °C (thermal)
    #[serde(default)]
    pub temperature_range: Option<(f64, f64)>,
    /// Consumption envelope (power)
    #[serde(default)]
    pub wattage_range: Option<WattageRange>,
    /// Characteristic open ports (network)
    #[serde(default)]
    pub ports: Vec<u16>,
    /// Named pattern detectors that count as evidence
    #[serde(default)]
    pub pattern_names: BTreeSet<String>,
    /// Prior confidence of the fingerprint, in (0, 1]
    pub base_confidence: f64,
}

impl DeviceSignature {
    /// Creates a signature with no modality-specific fields set.
    pub fn new(device_class: impl Into<String>, modality: Modality, base_confidence: f64) -> Self {
        Self {
            device_class: device_class.into(),
            modality,
            frequencies: Vec::new(),
            temperature_range: None,
            wattage_range: None,
            ports: Vec::new(),
            pattern_names: BTreeSet::new(),
            base_confidence,
        }
    }

    /// Sets the characteristic frequencies.
    #[must_use]
    pub fn with_frequencies(mut self, frequencies: impl IntoIterator<Item = f64>) -> Self {
        self.frequencies = frequencies.into_iter().collect();
        self
    }

    /// Sets the temperature range.
    #[must_use]
    pub fn with_temperature_range(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = Some((min, max));
        self
    }

    /// Sets the wattage range.
    #[must_use]
    pub fn with_wattage_range(mut self, normal_max: f64, mining_max: f64) -> Self {
        self.wattage_range = Some(WattageRange::new(normal_max, mining_max));
        self
    }

    /// Sets the characteristic ports.
    #[must_use]
    pub fn with_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    /// Sets the pattern names.
    #[must_use]
    pub fn with_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.pattern_names = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Checks the field invariants.
    pub fn validate(&self) -> std::result::Result<(), CatalogueError> {
        let invalid = |reason: String| CatalogueError::InvalidSignature {
            device_class: self.device_class.clone(),
            modality: self.modality,
            reason,
        };

        if self.device_class.trim().is_empty() {
            return Err(invalid("device class is empty".into()));
        }
        if !(self.base_confidence > 0.0 && self.base_confidence <= 1.0) {
            return Err(invalid(format!(
                "base confidence {} is outside (0, 1]",
                self.base_confidence
            )));
        }
        if let Some(f) = self
            .frequencies
            .iter()
            .find(|f| !f.is_finite() || **f < 0.0)
        {
            return Err(invalid(format!("frequency {f} must be finite and non-negative")));
        }
        if let Some((min, max)) = self.temperature_range {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(invalid(format!("temperature range {min}..{max} is inverted")));
            }
        }
        if let Some(range) = self.wattage_range {
            if !(range.normal_max >= 0.0 && range.normal_max < range.mining_max) {
                return Err(invalid(format!(
                    "wattage range normal max {} must be below mining max {}",
                    range.normal_max, range.mining_max
                )));
            }
        }

        for pattern in &self.pattern_names {
            if !self.pattern_is_known(pattern) {
                return Err(CatalogueError::UnknownPattern {
                    device_class: self.device_class.clone(),
                    modality: self.modality,
                    pattern: pattern.clone(),
                });
            }
        }
        Ok(())
    }

    fn pattern_is_known(&self, pattern: &str) -> bool {
        match self.modality {
            Modality::Acoustic | Modality::Rf => FrequencyPattern::from_name(pattern).is_some(),
            Modality::Thermal => ThermalPattern::from_name(pattern).is_some(),
            Modality::Power => PowerPattern::from_name(pattern).is_some(),
            Modality::Network => is_known_service_keyword(pattern),
        }
    }
}

#[derive(Deserialize)]
struct CatalogueDocument {
    signatures: Vec<DeviceSignature>,
}

/// Immutable, validated table of device signatures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureCatalogue {
    signatures: Vec<DeviceSignature>,
}

impl SignatureCatalogue {
    /// Builds a catalogue, validating every record.
    pub fn new(signatures: Vec<DeviceSignature>) -> std::result::Result<Self, CatalogueError> {
        if signatures.is_empty() {
            return Err(CatalogueError::Empty);
        }
        for signature in &signatures {
            signature.validate()?;
        }
        Ok(Self { signatures })
    }

    /// Parses a catalogue from a JSON document `{ "signatures": [...] }`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: CatalogueDocument = serde_json::from_str(json)?;
        let catalogue = Self::new(document.signatures)?;
        tracing::info!(
            signatures = catalogue.len(),
            classes = catalogue.device_classes().len(),
            "Loaded signature catalogue"
        );
        Ok(catalogue)
    }

    /// Reads and parses a JSON catalogue file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Serializes the catalogue to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in table for bitcoin, ethereum, litecoin and monero hardware.
    pub fn builtin() -> Self {
        Self {
            signatures: builtin_signatures(),
        }
    }

    /// All signatures in catalogue order.
    pub fn signatures(&self) -> &[DeviceSignature] {
        &self.signatures
    }

    /// Signatures of one modality, in catalogue order.
    pub fn signatures_for(&self, modality: Modality) -> impl Iterator<Item = &DeviceSignature> {
        self.signatures
            .iter()
            .filter(move |s| s.modality == modality)
    }

    /// Distinct device classes.
    pub fn device_classes(&self) -> BTreeSet<&str> {
        self.signatures
            .iter()
            .map(|s| s.device_class.as_str())
            .collect()
    }

    /// Number of signatures.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Always `false`; empty catalogues are rejected.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for SignatureCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

fn doubling_ladder(base: f64) -> Vec<f64> {
    (0..10).map(|i| base * f64::from(1u32 << i)).collect()
}

fn builtin_signatures() -> Vec<DeviceSignature> {
    use Modality::{Acoustic, Network, Power, Rf, Thermal};

    vec![
        // bitcoin (SHA-256 ASICs)
        DeviceSignature::new("bitcoin", Acoustic, 0.95)
            .with_frequencies(doubling_ladder(50.0))
            .with_patterns(["regular_harmonic_spacing", "mains_hum"]),
        DeviceSignature::new("bitcoin", Rf, 0.90)
            .with_frequencies([2.4e9, 5.8e9])
            .with_patterns(["broadband_emission"]),
        DeviceSignature::new("bitcoin", Thermal, 0.88)
            .with_temperature_range(45.0, 85.0)
            .with_patterns(["gpu_cluster", "asic_array"]),
        DeviceSignature::new("bitcoin", Power, 0.92)
            .with_wattage_range(500.0, 5000.0)
            .with_patterns(["constant_load", "sustained_mining_load"]),
        DeviceSignature::new("bitcoin", Network, 0.85)
            .with_ports([3333, 3334, 3335, 3336, 3337, 3338, 3339, 8332, 8333])
            .with_patterns(["stratum", "cgminer", "bfgminer"]),
        // ethereum (GPU rigs)
        DeviceSignature::new("ethereum", Acoustic, 0.93)
            .with_frequencies(doubling_ladder(60.0))
            .with_patterns(["mains_hum", "low_frequency_variance"]),
        DeviceSignature::new("ethereum", Rf, 0.87)
            .with_frequencies([2.4e9, 5.2e9])
            .with_patterns(["broadband_emission"]),
        DeviceSignature::new("ethereum", Thermal, 0.85)
            .with_temperature_range(50.0, 90.0)
            .with_patterns(["memory_intensive", "compute_units"]),
        DeviceSignature::new("ethereum", Power, 0.89)
            .with_wattage_range(300.0, 4000.0)
            .with_patterns(["sustained_mining_load", "load_spikes"]),
        DeviceSignature::new("ethereum", Network, 0.83)
            .with_ports([3333, 4444, 8080, 8545, 30303])
            .with_patterns(["stratum", "ethminer", "phoenixminer", "teamredminer"]),
        // litecoin (scrypt ASICs)
        DeviceSignature::new("litecoin", Acoustic, 0.91)
            .with_frequencies(doubling_ladder(70.0))
            .with_patterns(["regular_harmonic_spacing", "low_frequency_variance"]),
        DeviceSignature::new("litecoin", Rf, 0.84)
            .with_frequencies([2.4e9, 5.5e9])
            .with_patterns(["broadband_emission"]),
        DeviceSignature::new("litecoin", Thermal, 0.83)
            .with_temperature_range(40.0, 80.0)
            .with_patterns(["memory_intensive"]),
        DeviceSignature::new("litecoin", Power, 0.86)
            .with_wattage_range(400.0, 4500.0)
            .with_patterns(["constant_load", "load_spikes"]),
        DeviceSignature::new("litecoin", Network, 0.80)
            .with_ports([3333, 9332, 9333])
            .with_patterns(["stratum", "cgminer"]),
        // monero (CPU miners, fingerprinted on the network only)
        DeviceSignature::new("monero", Network, 0.82)
            .with_ports([3333, 4444, 18081, 18082, 18083])
            .with_patterns(["stratum", "xmrig"]),
    ]
}

/// Shared, swappable reference to the active catalogue.
#[derive(Debug)]
pub struct CatalogueHandle {
    current: RwLock<Arc<SignatureCatalogue>>,
}

impl CatalogueHandle {
    /// Wraps a catalogue.
    pub fn new(catalogue: SignatureCatalogue) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalogue)),
        }
    }

    /// The catalogue active right now. Later swaps do not affect it.
    pub fn snapshot(&self) -> Arc<SignatureCatalogue> {
        Arc::clone(&self.current.read())
    }

    /// Replaces the whole catalogue and returns the previous one.
    pub fn swap(&self, catalogue: SignatureCatalogue) -> Arc<SignatureCatalogue> {
        let next = Arc::new(catalogue);
        let signatures = next.len();
        let previous = std::mem::replace(&mut *self.current.write(), next);
        tracing::info!(signatures, "Swapped signature catalogue");
        previous
    }
}

impl Default for CatalogueHandle {
    fn default() -> Self {
        Self::new(SignatureCatalogue::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let catalogue = SignatureCatalogue::builtin();
        for signature in catalogue.signatures() {
            signature.validate().unwrap();
        }
        assert_eq!(
            catalogue.device_classes().into_iter().collect::<Vec<_>>(),
            vec!["bitcoin", "ethereum", "litecoin", "monero"]
        );
        assert_eq!(catalogue.signatures_for(Modality::Thermal).count(), 3);
        assert_eq!(catalogue.signatures_for(Modality::Network).count(), 4);
    }

    #[test]
    fn test_builtin_ladders() {
        let catalogue = SignatureCatalogue::builtin();
        let bitcoin = catalogue
            .signatures_for(Modality::Acoustic)
            .find(|s| s.device_class == "bitcoin")
            .unwrap();
        assert_eq!(bitcoin.frequencies.first(), Some(&50.0));
        assert_eq!(bitcoin.frequencies.last(), Some(&25_600.0));
    }

    #[test]
    fn test_invalid_base_confidence() {
        let sig = DeviceSignature::new("x", Modality::Acoustic, 0.0);
        assert!(matches!(
            sig.validate(),
            Err(CatalogueError::InvalidSignature { .. })
        ));
        let sig = DeviceSignature::new("x", Modality::Acoustic, 1.2);
        assert!(sig.validate().is_err());
    }

    #[test]
    fn test_invalid_ranges() {
        let sig = DeviceSignature::new("x", Modality::Thermal, 0.5).with_temperature_range(90.0, 40.0);
        assert!(sig.validate().is_err());

        let sig = DeviceSignature::new("x", Modality::Power, 0.5).with_wattage_range(500.0, 500.0);
        assert!(sig.validate().is_err());

        let sig = DeviceSignature::new("x", Modality::Acoustic, 0.5).with_frequencies([-5.0]);
        assert!(sig.validate().is_err());
    }

    #[test]
    fn test_unknown_pattern() {
        let sig = DeviceSignature::new("x", Modality::Thermal, 0.5).with_patterns(["mains_hum"]);
        assert!(matches!(
            sig.validate(),
            Err(CatalogueError::UnknownPattern { ref pattern, .. }) if pattern == "mains_hum"
        ));
    }

    #[test]
    fn test_empty_catalogue() {
        assert_eq!(SignatureCatalogue::new(Vec::new()), Err(CatalogueError::Empty));
    }

    #[test]
    fn test_wattage_interpolation() {
        let range = WattageRange::new(500.0, 5000.0);
        assert_eq!(range.interpolate(100.0), 0.0);
        assert!((range.interpolate(2750.0) - 0.5).abs() < 1e-12);
        assert_eq!(range.interpolate(9000.0), 1.0);
    }

    #[test]
    fn test_handle_swap() {
        let handle = CatalogueHandle::default();
        let before = handle.snapshot();

        let replacement = SignatureCatalogue::new(vec![DeviceSignature::new(
            "gpu-miner",
            Modality::Acoustic,
            0.7,
        )
        .with_frequencies([120.0])])
        .unwrap();
        let previous = handle.swap(replacement);

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.len(), SignatureCatalogue::builtin().len());
        assert_eq!(handle.snapshot().len(), 1);
    }
}
