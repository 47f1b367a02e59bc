//! Acoustic and RF matching against signature frequency lists.

use std::collections::BTreeSet;

use minesense_core::{utils, Modality};
use minesense_signal::SpectralFeatures;
use serde::{Deserialize, Serialize};

use super::{MatcherConfig, ModalityMatcher};
use crate::catalogue::SignatureCatalogue;
use crate::domain::ModalityScore;

const MAINS_FAMILIES: [[f64; 4]; 2] = [[50.0, 100.0, 150.0, 200.0], [60.0, 120.0, 180.0, 240.0]];
const MAINS_WINDOW_HZ: f64 = 2.0;
const LOW_FREQUENCY_LIMIT_HZ: f64 = 1000.0;

/// Named spectral shapes referenced by acoustic and RF signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyPattern {
    /// Evenly spaced peaks (fan blade pass, switching harmonics)
    RegularHarmonicSpacing,
    /// Energy at mains frequency multiples (PSU hum)
    MainsHum,
    /// Uneven amplitudes among the low-frequency peaks
    LowFrequencyVariance,
    /// Peaks spread over a wide band
    BroadbandEmission,
}

impl FrequencyPattern {
    /// Every pattern in the table.
    pub const ALL: [FrequencyPattern; 4] = [
        FrequencyPattern::RegularHarmonicSpacing,
        FrequencyPattern::MainsHum,
        FrequencyPattern::LowFrequencyVariance,
        FrequencyPattern::BroadbandEmission,
    ];

    /// Catalogue name of the pattern.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegularHarmonicSpacing => "regular_harmonic_spacing",
            Self::MainsHum => "mains_hum",
            Self::LowFrequencyVariance => "low_frequency_variance",
            Self::BroadbandEmission => "broadband_emission",
        }
    }

    /// Looks a pattern up by catalogue name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Evaluates the pattern on extracted features.
    pub fn detect(&self, features: &SpectralFeatures) -> bool {
        match self {
            Self::RegularHarmonicSpacing => regular_harmonic_spacing(features),
            Self::MainsHum => mains_hum(features),
            Self::LowFrequencyVariance => low_frequency_variance(features),
            Self::BroadbandEmission => features.spectral_bandwidth > 1000.0,
        }
    }
}

fn regular_harmonic_spacing(features: &SpectralFeatures) -> bool {
    let peaks = features.positive_peaks();
    if peaks.len() < 3 {
        return false;
    }
    let spacings: Vec<f64> = peaks
        .windows(2)
        .map(|w| w[1].frequency - w[0].frequency)
        .collect();
    utils::mean(&spacings) > 0.0 && utils::coefficient_of_variation(&spacings) < 0.1
}

fn mains_hum(features: &SpectralFeatures) -> bool {
    let peaks = features.positive_peaks();
    MAINS_FAMILIES.iter().any(|family| {
        family
            .iter()
            .filter(|&&hz| {
                peaks
                    .iter()
                    .any(|p| (p.frequency - hz).abs() <= MAINS_WINDOW_HZ)
            })
            .count()
            >= 2
    })
}

fn low_frequency_variance(features: &SpectralFeatures) -> bool {
    if features.max_amplitude <= 0.0 {
        return false;
    }
    let normalized: Vec<f64> = features
        .positive_peaks()
        .iter()
        .filter(|p| p.frequency < LOW_FREQUENCY_LIMIT_HZ)
        .map(|p| p.amplitude / features.max_amplitude)
        .collect();
    normalized.len() >= 2 && utils::variance(&normalized) > 0.05
}

/// Frequency-list matcher for one of the spectral modalities.
#[derive(Debug, Clone)]
pub struct FrequencyMatcher {
    modality: Modality,
    tolerance: f64,
    pattern_increment: f64,
}

impl FrequencyMatcher {
    /// Acoustic matcher with the configured acoustic tolerance.
    pub fn acoustic(config: &MatcherConfig) -> Self {
        Self {
            modality: Modality::Acoustic,
            tolerance: config.acoustic_tolerance,
            pattern_increment: config.pattern_increment,
        }
    }

    /// RF matcher with the configured (narrower) RF tolerance.
    pub fn rf(config: &MatcherConfig) -> Self {
        Self {
            modality: Modality::Rf,
            tolerance: config.rf_tolerance,
            pattern_increment: config.pattern_increment,
        }
    }

    /// Relative window used around each signature frequency.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl ModalityMatcher for FrequencyMatcher {
    type Features = SpectralFeatures;

    fn modality(&self) -> Modality {
        self.modality
    }

    fn match_features(
        &self,
        features: &SpectralFeatures,
        catalogue: &SignatureCatalogue,
    ) -> Vec<ModalityScore> {
        let max_amplitude = features.max_amplitude;
        if features.peaks.is_empty() || !(max_amplitude > 0.0) {
            return Vec::new();
        }

        let mut scores = Vec::new();
        for signature in catalogue.signatures_for(self.modality) {
            let mut score = 0.0;
            let mut evidence = BTreeSet::new();

            for &f in &signature.frequencies {
                let window = f * self.tolerance;
                let matched: Vec<f64> = features
                    .peaks
                    .iter()
                    .filter(|p| (p.frequency - f).abs() < window)
                    .map(|p| p.amplitude)
                    .collect();
                if !matched.is_empty() {
                    score += utils::mean(&matched) / max_amplitude;
                    evidence.insert(format!("{f} Hz"));
                }
            }

            for name in &signature.pattern_names {
                if FrequencyPattern::from_name(name).is_some_and(|p| p.detect(features)) {
                    score += self.pattern_increment;
                    evidence.insert(name.clone());
                }
            }

            if score > 0.0 {
                scores.push(ModalityScore::new(
                    signature.device_class.clone(),
                    self.modality,
                    score,
                    evidence,
                ));
            }
        }

        tracing::debug!(
            modality = %self.modality,
            peaks = features.peaks.len(),
            matched_classes = scores.len(),
            "Matched spectral features"
        );
        scores
    }
}
