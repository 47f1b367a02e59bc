//! Result types produced by a scan and by hotspot clustering.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use minesense_core::{DegenerateDataWarning, GeoLocation, Modality};
use minesense_signal::ThermalSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DetectionId(Uuid);

impl DetectionId {
    /// Create a new random detection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DetectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DetectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alerting severity of a detection
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below the medium threshold
    #[default]
    Low,
    /// Worth a follow-up
    Medium,
    /// Act on it
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

/// Match score of one device class on one modality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityScore {
    /// Device class the score refers to
    pub device_class: String,
    /// Modality that produced the score
    pub modality: Modality,
    /// Score in [0, 1]
    pub score: f64,
    /// Labels of the matched frequencies and patterns
    pub evidence: BTreeSet<String>,
}

impl ModalityScore {
    /// Creates a score, clamping it into [0, 1] (infinities included) and mapping NaN to 0.
    pub fn new(
        device_class: impl Into<String>,
        modality: Modality,
        score: f64,
        evidence: BTreeSet<String>,
    ) -> Self {
        Self {
            device_class: device_class.into(),
            modality,
            score: unit_interval(score),
            evidence,
        }
    }

    /// Returns `true` if the evidence set contains `label`.
    pub fn has_evidence(&self, label: &str) -> bool {
        self.evidence.contains(label)
    }
}

/// Outcome of one fused scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Unique identifier
    pub id: DetectionId,
    /// When the scanned readings were taken
    pub timestamp: DateTime<Utc>,
    /// Where the readings were taken, if known
    pub location: Option<GeoLocation>,
    /// Per-modality scores in modality order
    pub modality_scores: Vec<ModalityScore>,
    /// Fused confidence in [0, 1]
    pub overall_confidence: f64,
    /// Severity derived from the confidence
    pub severity: Severity,
    /// Inputs that carried no usable signal
    #[serde(default)]
    pub warnings: Vec<DegenerateDataWarning>,
    /// Condensed thermal findings, when a thermal frame was scanned
    #[serde(default)]
    pub thermal_summary: Option<ThermalSummary>,
}

impl DetectionResult {
    /// Creates a result stamped now with a fresh ID.
    ///
    /// The confidence is clamped into [0, 1] and NaN becomes 0.
    pub fn new(
        location: Option<GeoLocation>,
        modality_scores: Vec<ModalityScore>,
        overall_confidence: f64,
        severity: Severity,
    ) -> Self {
        Self {
            id: DetectionId::new(),
            timestamp: Utc::now(),
            location,
            modality_scores,
            overall_confidence: unit_interval(overall_confidence),
            severity,
            warnings: Vec::new(),
            thermal_summary: None,
        }
    }

    /// Scores produced by one modality.
    pub fn scores_for(&self, modality: Modality) -> impl Iterator<Item = &ModalityScore> {
        self.modality_scores
            .iter()
            .filter(move |s| s.modality == modality)
    }

    /// Score of a device class on a modality, if one was produced.
    pub fn score(&self, device_class: &str, modality: Modality) -> Option<&ModalityScore> {
        self.modality_scores
            .iter()
            .find(|s| s.modality == modality && s.device_class == device_class)
    }

    /// Device class holding the single highest score.
    pub fn dominant_device_class(&self) -> Option<&str> {
        dominant_score(&self.modality_scores).map(|s| s.device_class.as_str())
    }

    /// Returns `true` if nothing matched on any modality.
    pub fn is_clear(&self) -> bool {
        self.modality_scores.is_empty()
    }
}

/// Highest score, first one wins on ties.
pub(crate) fn dominant_score(scores: &[ModalityScore]) -> Option<&ModalityScore> {
    scores.iter().fold(None, |best: Option<&ModalityScore>, s| match best {
        Some(b) if b.score >= s.score => Some(b),
        _ => Some(s),
    })
}

/// A hotspot of georeferenced detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster label, in order of discovery
    pub label: usize,
    /// Mean member position
    pub centroid: GeoLocation,
    /// Number of member detections
    pub member_count: usize,
    /// Mean overall confidence of the members
    pub average_confidence: f64,
    /// Member detection IDs, in input order
    pub member_detections: Vec<DetectionId>,
}

/// Clusters plus bookkeeping over the whole batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    /// Clusters found
    pub clusters: Vec<Cluster>,
    /// Detections submitted
    pub total_detections: usize,
    /// Detections that belong to a cluster
    pub clustered_detections: usize,
    /// Located detections that belong to no cluster
    pub noise_detections: usize,
}

impl ClusterReport {
    /// Cluster with the highest average confidence.
    pub fn hottest(&self) -> Option<&Cluster> {
        self.clusters
            .iter()
            .max_by(|a, b| a.average_confidence.total_cmp(&b.average_confidence))
    }
}

/// Clamps into [0, 1]; NaN maps to 0.
fn unit_interval(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
