//! Confidence fusion of per-modality scores and thermal findings.
//!
//! The fused confidence is an additive, capped heuristic:
//!
//! | Term | Weight |
//! |------|--------|
//! | highest score of the dominant device class | × 0.6 |
//! | hot spot area ratio > 5 % | + 0.2 |
//! | max thermal gradient > 10 °C/cell | + 0.2 |
//! | ≥ 3 linear patterns | + 0.2 |
//! | anomaly ratio > 1 % | + 0.2 |
//! | anomaly severity high | + 0.1 |
//! | highest thermal modality score | × 0.3 |
//!
//! All weights live in [`FusionWeights`] and are calibration parameters.

use minesense_core::Modality;
use minesense_signal::{AnomalySeverity, ThermalAnalysis};
use serde::{Deserialize, Serialize};

use crate::domain::{dominant_score, ModalityScore, Severity};
use crate::{DetectError, Result};

/// Weights and trigger thresholds of the fusion terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    /// Multiplier for the dominant class score
    pub dominant_class_weight: f64,
    /// Bonus when the hot spot area ratio exceeds its threshold
    pub hot_spot_bonus: f64,
    /// Hot spot area ratio threshold
    pub hot_spot_ratio_threshold: f64,
    /// Bonus when the max gradient exceeds its threshold
    pub gradient_bonus: f64,
    /// Max gradient threshold (°C per cell)
    pub gradient_threshold: f64,
    /// Bonus for enough linear patterns
    pub linear_pattern_bonus: f64,
    /// Minimum number of linear patterns
    pub min_linear_patterns: usize,
    /// Bonus when the anomaly ratio exceeds its threshold
    pub anomaly_bonus: f64,
    /// Anomaly ratio threshold
    pub anomaly_ratio_threshold: f64,
    /// Bonus for high anomaly severity
    pub high_severity_bonus: f64,
    /// Multiplier for the best thermal modality score
    pub thermal_score_weight: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            dominant_class_weight: 0.6,
            hot_spot_bonus: 0.2,
            hot_spot_ratio_threshold: 0.05,
            gradient_bonus: 0.2,
            gradient_threshold: 10.0,
            linear_pattern_bonus: 0.2,
            min_linear_patterns: 3,
            anomaly_bonus: 0.2,
            anomaly_ratio_threshold: 0.01,
            high_severity_bonus: 0.1,
            thermal_score_weight: 0.3,
        }
    }
}

/// Confidence cut points for severity classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    /// Confidence at or above which severity is high
    pub high: f64,
    /// Confidence at or above which severity is medium
    pub medium: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
        }
    }
}

impl SeverityThresholds {
    /// Checks `0 ≤ medium ≤ high ≤ 1`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0 <= self.medium && self.medium <= self.high && self.high <= 1.0) {
            return Err(DetectError::Config(format!(
                "severity thresholds must satisfy 0 <= medium ({}) <= high ({}) <= 1",
                self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Fuses modality scores into one confidence and classifies it.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceFusion {
    weights: FusionWeights,
    thresholds: SeverityThresholds,
}

impl ConfidenceFusion {
    /// Create a new fusion step
    pub fn new(weights: FusionWeights, thresholds: SeverityThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Get the fusion weights
    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    /// Fused confidence in [0, 1].
    ///
    /// There is no RF analysis input: RF evidence only counts through its
    /// entries in `scores`, and never adds a bonus of its own.
    pub fn fuse(&self, scores: &[ModalityScore], thermal: Option<&ThermalAnalysis>) -> f64 {
        let w = &self.weights;
        let mut confidence = 0.0;

        if let Some(dominant) = dominant_score(scores) {
            confidence += finite(dominant.score * w.dominant_class_weight);
        }

        if let Some(analysis) = thermal {
            if analysis.hot_spots.area_ratio > w.hot_spot_ratio_threshold {
                confidence += w.hot_spot_bonus;
            }
            if analysis.gradients.max_gradient > w.gradient_threshold {
                confidence += w.gradient_bonus;
            }
            if analysis.linear_patterns.len() >= w.min_linear_patterns {
                confidence += w.linear_pattern_bonus;
            }
            if analysis.anomalies.ratio > w.anomaly_ratio_threshold {
                confidence += w.anomaly_bonus;
            }
            if analysis.anomalies.severity == AnomalySeverity::High {
                confidence += w.high_severity_bonus;
            }
        }

        let best_thermal = scores
            .iter()
            .filter(|s| s.modality == Modality::Thermal)
            .map(|s| finite(s.score))
            .fold(0.0, f64::max);
        confidence += finite(best_thermal * w.thermal_score_weight);

        finite(confidence).clamp(0.0, 1.0)
    }

    /// Severity of a fused confidence.
    pub fn classify(&self, confidence: f64) -> Severity {
        if confidence >= self.thresholds.high {
            Severity::High
        } else if confidence >= self.thresholds.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn score(class: &str, modality: Modality, value: f64) -> ModalityScore {
        ModalityScore::new(class, modality, value, BTreeSet::new())
    }

    #[test]
    fn test_no_evidence_is_zero() {
        let fusion = ConfidenceFusion::default();
        assert_eq!(fusion.fuse(&[], None), 0.0);
        assert_eq!(fusion.classify(0.0), Severity::Low);
    }

    #[test]
    fn test_dominant_score_weight() {
        let fusion = ConfidenceFusion::default();
        let scores = [
            score("bitcoin", Modality::Acoustic, 1.0),
            score("ethereum", Modality::Acoustic, 0.4),
        ];
        assert!((fusion.fuse(&scores, None) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_thermal_score_term() {
        let fusion = ConfidenceFusion::default();
        let scores = [score("bitcoin", Modality::Thermal, 1.0)];
        // 0.6 from the dominant class plus 0.3 from the thermal term
        assert!((fusion.fuse(&scores, None) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_rf_counts_only_through_scores() {
        let fusion = ConfidenceFusion::default();
        let rf = [score("bitcoin", Modality::Rf, 0.5)];
        assert!((fusion.fuse(&rf, None) - 0.3).abs() < 1e-12);

        let acoustic = [score("bitcoin", Modality::Acoustic, 0.5)];
        assert_eq!(fusion.fuse(&rf, None), fusion.fuse(&acoustic, None));
    }

    #[test]
    fn test_thermal_bonuses_are_capped() {
        let fusion = ConfidenceFusion::default();
        let mut analysis = ThermalAnalysis::default();
        analysis.hot_spots.area_ratio = 0.2;
        analysis.gradients.max_gradient = 40.0;
        analysis.anomalies.ratio = 0.15;
        analysis.anomalies.severity = AnomalySeverity::High;

        let bonuses_only = fusion.fuse(&[], Some(&analysis));
        assert!((bonuses_only - 0.7).abs() < 1e-12);

        let scores = [score("bitcoin", Modality::Thermal, 1.0)];
        assert_eq!(fusion.fuse(&scores, Some(&analysis)), 1.0);
    }

    #[test]
    fn test_severity_cut_points() {
        let fusion = ConfidenceFusion::default();
        assert_eq!(fusion.classify(0.8), Severity::High);
        assert_eq!(fusion.classify(0.79), Severity::Medium);
        assert_eq!(fusion.classify(0.5), Severity::Medium);
        assert_eq!(fusion.classify(0.49), Severity::Low);
    }

    #[test]
    fn test_invalid_thresholds() {
        let thresholds = SeverityThresholds {
            high: 0.4,
            medium: 0.6,
        };
        assert!(thresholds.validate().is_err());
    }
}
