//! Power draw matching against signature wattage envelopes.

use std::collections::BTreeSet;

use minesense_core::{utils, Modality, PowerReading};
use serde::{Deserialize, Serialize};

use super::{MatcherConfig, ModalityMatcher};
use crate::catalogue::{SignatureCatalogue, WattageRange};
use crate::domain::ModalityScore;

/// Minimum duration of an above-normal run for `sustained_mining_load`.
const SUSTAINED_LOAD_SECS: f64 = 300.0;
/// Spike threshold relative to the series mean.
const SPIKE_FACTOR: f64 = 1.5;

/// Named load shapes referenced by power signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPattern {
    /// Flat draw above the normal envelope
    ConstantLoad,
    /// Uninterrupted above-normal draw for more than five minutes
    SustainedMiningLoad,
    /// Consecutive samples well above the average
    LoadSpikes,
}

impl PowerPattern {
    /// Every pattern in the table.
    pub const ALL: [PowerPattern; 3] = [
        PowerPattern::ConstantLoad,
        PowerPattern::SustainedMiningLoad,
        PowerPattern::LoadSpikes,
    ];

    /// Catalogue name of the pattern.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConstantLoad => "constant_load",
            Self::SustainedMiningLoad => "sustained_mining_load",
            Self::LoadSpikes => "load_spikes",
        }
    }

    /// Looks a pattern up by catalogue name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Evaluates the pattern on a reading's time series.
    pub fn detect(&self, reading: &PowerReading, range: &WattageRange) -> bool {
        let series = &reading.samples;
        match self {
            Self::ConstantLoad => {
                series.len() >= 2
                    && utils::mean(series) > range.normal_max
                    && utils::coefficient_of_variation(series) < 0.1
            }
            Self::SustainedMiningLoad => {
                longest_run_above(series, range.normal_max) as f64 * reading.sample_interval_secs
                    > SUSTAINED_LOAD_SECS
            }
            Self::LoadSpikes => {
                let threshold = SPIKE_FACTOR * utils::mean(series);
                threshold > 0.0
                    && series
                        .windows(2)
                        .any(|w| w[0] > threshold && w[1] > threshold)
            }
        }
    }
}

fn longest_run_above(series: &[f64], threshold: f64) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for &watts in series {
        if watts > threshold {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Scores a power reading against power signatures.
#[derive(Debug, Clone)]
pub struct PowerMatcher {
    pattern_increment: f64,
}

impl PowerMatcher {
    /// Create a new power matcher
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            pattern_increment: config.pattern_increment,
        }
    }

    /// Load compared against the envelopes: the average, or the
    /// instantaneous draw when no average was recorded.
    pub fn observed_load(reading: &PowerReading) -> f64 {
        if reading.average > 0.0 {
            reading.average
        } else {
            reading.instantaneous
        }
    }
}

impl Default for PowerMatcher {
    fn default() -> Self {
        Self::new(&MatcherConfig::default())
    }
}

impl ModalityMatcher for PowerMatcher {
    type Features = PowerReading;

    fn modality(&self) -> Modality {
        Modality::Power
    }

    fn match_features(
        &self,
        reading: &PowerReading,
        catalogue: &SignatureCatalogue,
    ) -> Vec<ModalityScore> {
        let observed = Self::observed_load(reading);

        catalogue
            .signatures_for(Modality::Power)
            .filter_map(|signature| {
                let range = signature.wattage_range?;
                let mut evidence = BTreeSet::new();

                let mut score = range.interpolate(observed);
                if score > 0.0 {
                    evidence.insert("load_above_normal".to_string());
                }
                if reading.peak > range.mining_max {
                    evidence.insert("peak_over_mining_max".to_string());
                }
                for name in &signature.pattern_names {
                    if PowerPattern::from_name(name).is_some_and(|p| p.detect(reading, &range)) {
                        score += self.pattern_increment;
                        evidence.insert(name.clone());
                    }
                }

                (score > 0.0).then(|| {
                    ModalityScore::new(
                        signature.device_class.clone(),
                        Modality::Power,
                        score,
                        evidence,
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::DeviceSignature;

    fn catalogue() -> SignatureCatalogue {
        SignatureCatalogue::new(vec![DeviceSignature::new("bitcoin", Modality::Power, 0.92)
            .with_wattage_range(500.0, 5000.0)
            .with_patterns(["constant_load", "sustained_mining_load", "load_spikes"])])
        .unwrap()
    }

    #[test]
    fn test_linear_interpolation() {
        let reading = PowerReading::new(3000.0, 3200.0, 2750.0).unwrap();
        let scores = PowerMatcher::default().match_features(&reading, &catalogue());
        assert_eq!(scores.len(), 1);
        assert!((scores[0].score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_household_load_scores_nothing() {
        let reading = PowerReading::new(180.0, 400.0, 150.0).unwrap();
        assert!(PowerMatcher::default()
            .match_features(&reading, &catalogue())
            .is_empty());
    }

    #[test]
    fn test_instantaneous_fallback_and_peak() {
        let reading = PowerReading::new(5000.0, 6000.0, 0.0).unwrap();
        let scores = PowerMatcher::default().match_features(&reading, &catalogue());
        assert_eq!(scores[0].score, 1.0);
        assert!(scores[0].has_evidence("peak_over_mining_max"));
    }

    #[test]
    fn test_sustained_constant_load() {
        let reading = PowerReading::new(1400.0, 1420.0, 1400.0)
            .unwrap()
            .with_series(vec![1400.0; 400], 1.0)
            .unwrap();
        let scores = PowerMatcher::default().match_features(&reading, &catalogue());
        let bitcoin = &scores[0];
        assert!(bitcoin.has_evidence("constant_load"));
        assert!(bitcoin.has_evidence("sustained_mining_load"));
        assert!(!bitcoin.has_evidence("load_spikes"));
        assert!((bitcoin.score - (0.2 + 0.2 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_load_spikes() {
        let mut series = vec![100.0; 20];
        series[10] = 400.0;
        series[11] = 400.0;
        let reading = PowerReading::new(100.0, 400.0, 130.0)
            .unwrap()
            .with_series(series, 1.0)
            .unwrap();
        let range = WattageRange::new(500.0, 5000.0);
        assert!(PowerPattern::LoadSpikes.detect(&reading, &range));
        assert!(!PowerPattern::SustainedMiningLoad.detect(&reading, &range));
    }

    #[test]
    fn test_zero_reading() {
        let reading = PowerReading::new(0.0, 0.0, 0.0).unwrap();
        assert!(PowerMatcher::default()
            .match_features(&reading, &SignatureCatalogue::builtin())
            .is_empty());
    }
}
