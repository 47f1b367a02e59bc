//! Thermal matching against signature temperature ranges and heat patterns.

use std::collections::BTreeSet;

use minesense_core::Modality;
use minesense_signal::ThermalAnalysis;

use super::{MatcherConfig, ModalityMatcher};
use crate::catalogue::SignatureCatalogue;
use crate::domain::ModalityScore;

/// Evidence label for a mining-like temperature distribution.
pub const MINING_DISTRIBUTION: &str = "mining_distribution";

/// Scores a thermal analysis against thermal signatures.
#[derive(Debug, Clone)]
pub struct ThermalMatcher {
    range_increment: f64,
    pattern_increment: f64,
    distribution_increment: f64,
}

impl ThermalMatcher {
    /// Create a new thermal matcher
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            range_increment: config.thermal_range_increment,
            pattern_increment: config.thermal_pattern_increment,
            distribution_increment: config.thermal_distribution_increment,
        }
    }
}

impl Default for ThermalMatcher {
    fn default() -> Self {
        Self::new(&MatcherConfig::default())
    }
}

impl ModalityMatcher for ThermalMatcher {
    type Features = ThermalAnalysis;

    fn modality(&self) -> Modality {
        Modality::Thermal
    }

    fn match_features(
        &self,
        analysis: &ThermalAnalysis,
        catalogue: &SignatureCatalogue,
    ) -> Vec<ModalityScore> {
        // a flat frame carries no thermal signature
        if analysis.is_degenerate() {
            return Vec::new();
        }

        let max_temp = analysis.stats.max;
        let mining_like = analysis.distribution.is_mining_like();

        catalogue
            .signatures_for(Modality::Thermal)
            .filter_map(|signature| {
                let mut score = 0.0;
                let mut evidence = BTreeSet::new();

                if let Some((min, max)) = signature.temperature_range {
                    if (min..=max).contains(&max_temp) {
                        score += self.range_increment;
                        evidence.insert(format!("temp_range_{min}-{max}"));
                    }
                }
                for name in &signature.pattern_names {
                    if analysis.has_pattern(name) {
                        score += self.pattern_increment;
                        evidence.insert(name.clone());
                    }
                }
                if mining_like {
                    score += self.distribution_increment;
                    evidence.insert(MINING_DISTRIBUTION.to_string());
                }

                (score > 0.0).then(|| {
                    ModalityScore::new(
                        signature.device_class.clone(),
                        Modality::Thermal,
                        score,
                        evidence,
                    )
                })
            })
            .collect()
    }
}
