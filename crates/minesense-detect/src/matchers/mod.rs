//! Per-modality signature matchers.
//!
//! Each matcher compares the features extracted from one modality against the
//! signatures of that modality in the catalogue and yields one
//! [`ModalityScore`] per device class with positive evidence. Matchers never
//! fail: missing or degenerate input simply produces no scores.
//!
//! Named pattern detectors are table driven. Every modality has a pattern enum
//! whose variants map a catalogue name to a predicate over the features, so a
//! new pattern is one variant and one predicate.

pub mod frequency;
pub mod network;
pub mod power;
pub mod thermal;

use minesense_core::Modality;
use serde::{Deserialize, Serialize};

use crate::catalogue::SignatureCatalogue;
use crate::domain::ModalityScore;

pub use frequency::{FrequencyMatcher, FrequencyPattern};
pub use network::NetworkMatcher;
pub use power::{PowerMatcher, PowerPattern};
pub use thermal::ThermalMatcher;

/// Scores extracted features of one modality against a catalogue.
pub trait ModalityMatcher {
    /// Feature type consumed by the matcher
    type Features: ?Sized;

    /// Modality this matcher scores
    fn modality(&self) -> Modality;

    /// Scores every signature of [`Self::modality`] and returns the device
    /// classes with a positive score, in catalogue order.
    fn match_features(
        &self,
        features: &Self::Features,
        catalogue: &SignatureCatalogue,
    ) -> Vec<ModalityScore>;
}

/// Scoring increments and tolerances shared by the matchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Relative frequency window for acoustic signatures
    pub acoustic_tolerance: f64,
    /// Relative frequency window for RF signatures
    pub rf_tolerance: f64,
    /// Increment per triggered frequency or power pattern
    pub pattern_increment: f64,
    /// Increment when the frame maximum lies in the signature range
    pub thermal_range_increment: f64,
    /// Increment per triggered thermal pattern
    pub thermal_pattern_increment: f64,
    /// Increment for a mining-like temperature distribution
    pub thermal_distribution_increment: f64,
    /// Increment per open signature port
    pub port_increment: f64,
    /// Increment when a mining service is observed
    pub service_increment: f64,
    /// Increment for an open SSH port
    pub ssh_increment: f64,
    /// Increment for an open web port
    pub web_increment: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            acoustic_tolerance: 0.1,
            rf_tolerance: 0.01,
            pattern_increment: 0.2,
            thermal_range_increment: 0.4,
            thermal_pattern_increment: 0.3,
            thermal_distribution_increment: 0.3,
            port_increment: 0.3,
            service_increment: 0.4,
            ssh_increment: 0.1,
            web_increment: 0.05,
        }
    }
}

impl MatcherConfig {
    /// Checks that tolerances are in (0, 1) and increments are non-negative.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("acoustic_tolerance", self.acoustic_tolerance),
            ("rf_tolerance", self.rf_tolerance),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(crate::DetectError::Config(format!(
                    "{name} must be in (0, 1), got {value}"
                )));
            }
        }
        for (name, value) in [
            ("pattern_increment", self.pattern_increment),
            ("thermal_range_increment", self.thermal_range_increment),
            ("thermal_pattern_increment", self.thermal_pattern_increment),
            ("thermal_distribution_increment", self.thermal_distribution_increment),
            ("port_increment", self.port_increment),
            ("service_increment", self.service_increment),
            ("ssh_increment", self.ssh_increment),
            ("web_increment", self.web_increment),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(crate::DetectError::Config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatcherConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_tolerance() {
        let config = MatcherConfig {
            rf_tolerance: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
