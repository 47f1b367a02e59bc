//! Hotspot clustering of georeferenced detections.

use geo::HaversineDistance;
use minesense_core::spatial::{dbscan, group_labels, planar_distance};
use minesense_core::GeoLocation;
use serde::{Deserialize, Serialize};

use crate::domain::{Cluster, ClusterReport, DetectionResult};

/// Distance between two detection locations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance in coordinate units
    #[default]
    Planar,
    /// Great-circle distance in metres (coordinates in degrees)
    Haversine,
}

impl DistanceMetric {
    /// Distance between two locations under this metric.
    pub fn distance(&self, a: &GeoLocation, b: &GeoLocation) -> f64 {
        match self {
            DistanceMetric::Planar => planar_distance(
                &[a.longitude, a.latitude],
                &[b.longitude, b.latitude],
            ),
            DistanceMetric::Haversine => a.to_point().haversine_distance(&b.to_point()),
        }
    }
}

/// Clustering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Neighborhood radius, in metric units
    pub epsilon: f64,
    /// Minimum neighbors (self included) of a core detection
    pub min_points: usize,
    /// Distance metric
    pub metric: DistanceMetric,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            min_points: 2,
            metric: DistanceMetric::Planar,
        }
    }
}

/// Groups detections into density-based hotspots.
#[derive(Debug, Clone, Default)]
pub struct SpatialClusterAnalyzer {
    metric: DistanceMetric,
}

impl SpatialClusterAnalyzer {
    /// Create an analyzer using `metric`
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }

    /// Get the distance metric
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Clusters the located detections.
    ///
    /// Detections without a location are ignored. Fewer than two located
    /// detections yield no clusters. Clusters are labelled in order of their
    /// first member in the input.
    #[tracing::instrument(skip(self, detections), fields(detections = detections.len()))]
    pub fn cluster(
        &self,
        detections: &[DetectionResult],
        epsilon: f64,
        min_points: usize,
    ) -> Vec<Cluster> {
        self.report(detections, epsilon, min_points).clusters
    }

    /// Clusters with parameters taken from a [`ClusterConfig`].
    pub fn cluster_with(&self, detections: &[DetectionResult], config: &ClusterConfig) -> Vec<Cluster> {
        Self::new(config.metric).cluster(detections, config.epsilon, config.min_points)
    }

    /// Clusters plus batch bookkeeping.
    #[allow(clippy::cast_precision_loss)]
    pub fn report(
        &self,
        detections: &[DetectionResult],
        epsilon: f64,
        min_points: usize,
    ) -> ClusterReport {
        let located: Vec<(&DetectionResult, GeoLocation)> = detections
            .iter()
            .filter_map(|d| d.location.map(|loc| (d, loc)))
            .collect();

        if located.len() < 2 {
            return ClusterReport {
                clusters: Vec::new(),
                total_detections: detections.len(),
                clustered_detections: 0,
                noise_detections: located.len(),
            };
        }

        let points: Vec<GeoLocation> = located.iter().map(|(_, loc)| *loc).collect();
        let labels = dbscan(&points, epsilon, min_points, |a, b| self.metric.distance(a, b));

        let clusters: Vec<Cluster> = group_labels(&labels)
            .into_iter()
            .enumerate()
            .map(|(label, members)| {
                let n = members.len() as f64;
                let latitude = members.iter().map(|&i| points[i].latitude).sum::<f64>() / n;
                let longitude = members.iter().map(|&i| points[i].longitude).sum::<f64>() / n;
                let average_confidence = members
                    .iter()
                    .map(|&i| located[i].0.overall_confidence)
                    .sum::<f64>()
                    / n;
                Cluster {
                    label,
                    centroid: GeoLocation {
                        latitude,
                        longitude,
                    },
                    member_count: members.len(),
                    average_confidence,
                    member_detections: members.iter().map(|&i| located[i].0.id).collect(),
                }
            })
            .collect();

        let clustered: usize = clusters.iter().map(|c| c.member_count).sum();
        tracing::debug!(
            located = located.len(),
            clusters = clusters.len(),
            clustered,
            "Clustered detections"
        );

        ClusterReport {
            clusters,
            total_detections: detections.len(),
            clustered_detections: clustered,
            noise_detections: located.len() - clustered,
        }
    }
}
