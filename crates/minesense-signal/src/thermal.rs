//! Thermal Anomaly Analysis
//!
//! Characterises a thermal frame the way an analyst would when looking for
//! mining rigs: how hot it runs, where the hot spots and statistical outliers
//! sit, whether the heat is arranged along straight structures (rack rows,
//! heat sinks), and whether the temperature distribution has the long hot tail
//! that densely packed compute hardware produces.
//!
//! Nothing in here fails on flat or tiny frames. A uniform grid simply has no
//! hot spots, no anomalies, no lines and a non-mining distribution.

use std::collections::BTreeSet;

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use minesense_core::spatial::{grid_dbscan, group_labels, planar_distance};
use minesense_core::utils;
use minesense_core::ThermalGrid;
use ndarray::Array2;
use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::spectral::find_peaks;
use crate::{Result, SignalError};

/// Upper bound on the cells used by pairwise-distance pattern tests.
const PAIRWISE_SAMPLE_LIMIT: usize = 2048;

/// Smallest frame (per side) on which edge and line detection runs.
const MIN_LINE_GRID_SIDE: usize = 3;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`ThermalAnalyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalAnalyzerConfig {
    /// Hot spot threshold in standard deviations above the mean
    pub hot_spot_sigma: f64,
    /// Anomaly threshold in standard deviations above the mean
    pub anomaly_sigma: f64,
    /// Neighborhood radius (grid cells) for clustering anomalous cells
    pub anomaly_cluster_distance: f64,
    /// Minimum cells per anomaly cluster
    pub anomaly_cluster_min_cells: usize,
    /// Canny low hysteresis threshold (grey levels)
    pub canny_low: f64,
    /// Canny high hysteresis threshold (grey levels)
    pub canny_high: f64,
    /// Minimum Hough accumulator votes for a line
    pub hough_vote_threshold: u32,
    /// Non-maximum suppression radius in Hough space
    pub hough_suppression_radius: u32,
    /// Minimum clipped segment length (grid cells) for a reported line
    pub min_line_length: f64,
    /// Anomaly ratio above which severity is high
    pub severity_high_ratio: f64,
    /// Anomaly ratio above which severity is medium
    pub severity_medium_ratio: f64,
}

impl Default for ThermalAnalyzerConfig {
    fn default() -> Self {
        Self {
            hot_spot_sigma: 2.0,
            anomaly_sigma: 3.0,
            anomaly_cluster_distance: 10.0,
            anomaly_cluster_min_cells: 2,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 50,
            hough_suppression_radius: 8,
            min_line_length: 20.0,
            severity_high_ratio: 0.1,
            severity_medium_ratio: 0.05,
        }
    }
}

impl ThermalAnalyzerConfig {
    /// Create a builder
    pub fn builder() -> ThermalAnalyzerConfigBuilder {
        ThermalAnalyzerConfigBuilder::default()
    }

    /// Validates threshold ordering.
    pub fn validate(&self) -> Result<()> {
        if !(self.hot_spot_sigma >= 0.0 && self.anomaly_sigma >= 0.0) {
            return Err(SignalError::InvalidConfig(
                "sigma thresholds must be non-negative".into(),
            ));
        }
        if !(self.canny_low <= self.canny_high) {
            return Err(SignalError::InvalidConfig(format!(
                "canny_low {} exceeds canny_high {}",
                self.canny_low, self.canny_high
            )));
        }
        if !(self.severity_medium_ratio <= self.severity_high_ratio) {
            return Err(SignalError::InvalidConfig(
                "medium severity ratio exceeds high severity ratio".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ThermalAnalyzerConfig`]
#[derive(Debug, Default)]
pub struct ThermalAnalyzerConfigBuilder {
    config: ThermalAnalyzerConfig,
}

impl ThermalAnalyzerConfigBuilder {
    /// Set hot spot threshold (sigmas)
    pub fn hot_spot_sigma(mut self, sigma: f64) -> Self {
        self.config.hot_spot_sigma = sigma.max(0.0);
        self
    }

    /// Set anomaly threshold (sigmas)
    pub fn anomaly_sigma(mut self, sigma: f64) -> Self {
        self.config.anomaly_sigma = sigma.max(0.0);
        self
    }

    /// Set anomaly clustering radius and minimum cluster size
    pub fn anomaly_clustering(mut self, distance: f64, min_cells: usize) -> Self {
        self.config.anomaly_cluster_distance = distance.max(1.0);
        self.config.anomaly_cluster_min_cells = min_cells.max(1);
        self
    }

    /// Set Canny hysteresis thresholds
    pub fn canny_thresholds(mut self, low: f64, high: f64) -> Self {
        let low = low.clamp(0.0, 255.0);
        self.config.canny_low = low;
        self.config.canny_high = high.clamp(low, 1442.0);
        self
    }

    /// Set Hough vote threshold
    pub fn hough_vote_threshold(mut self, votes: u32) -> Self {
        self.config.hough_vote_threshold = votes.max(1);
        self
    }

    /// Set minimum reported line length
    pub fn min_line_length(mut self, length: f64) -> Self {
        self.config.min_line_length = length.max(0.0);
        self
    }

    /// Set severity ratio cut points
    pub fn severity_ratios(mut self, medium: f64, high: f64) -> Self {
        let medium = medium.clamp(0.0, 1.0);
        self.config.severity_medium_ratio = medium;
        self.config.severity_high_ratio = high.clamp(medium, 1.0);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ThermalAnalyzerConfig {
        self.config
    }
}

// =============================================================================
// Analysis results
// =============================================================================

/// Basic temperature statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalStats {
    /// Coldest cell
    pub min: f64,
    /// Hottest cell
    pub max: f64,
    /// Mean temperature
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
}

/// Spatial gradient magnitude statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GradientStats {
    /// Largest gradient magnitude (°C per cell)
    pub max_gradient: f64,
    /// Mean gradient magnitude
    pub mean_gradient: f64,
    /// Standard deviation of the gradient magnitude
    pub gradient_std: f64,
}

/// Cells significantly hotter than the frame average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HotSpotStats {
    /// Temperature threshold used
    pub threshold: f64,
    /// Number of hot cells
    pub count: usize,
    /// Hot cells as a fraction of the frame
    pub area_ratio: f64,
    /// Hottest hot cell (0 when there are none)
    pub max_hot_spot_temp: f64,
}

/// Coarse severity of the anomalous area.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    /// Little or no anomalous area
    #[default]
    Low,
    /// Noticeable anomalous area
    Medium,
    /// Large anomalous area
    High,
}

impl AnomalySeverity {
    /// Classifies an anomaly ratio against strict cut points.
    #[must_use]
    pub fn from_ratio(ratio: f64, medium: f64, high: f64) -> Self {
        if ratio > high {
            Self::High
        } else if ratio > medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A spatially coherent group of anomalous cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCluster {
    /// Number of cells
    pub size: usize,
    /// Mean position as (x = column, y = row)
    pub centroid: (f64, f64),
    /// Hottest cell in the cluster
    pub max_temperature: f64,
    /// Mean temperature of the cluster
    pub mean_temperature: f64,
}

/// Statistical outliers of the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalAnomalies {
    /// Temperature threshold used
    pub threshold: f64,
    /// Number of anomalous cells
    pub count: usize,
    /// Anomalous cells as a fraction of the frame
    pub ratio: f64,
    /// Severity derived from the ratio
    pub severity: AnomalySeverity,
    /// Clusters of anomalous cells
    pub clusters: Vec<AnomalyCluster>,
}

/// A straight structure found by edge and line detection, clipped to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearPattern {
    /// Segment start (x, y)
    pub start: (f64, f64),
    /// Segment end (x, y)
    pub end: (f64, f64),
    /// Segment length in cells
    pub length: f64,
    /// Segment direction in degrees, `(-180, 180]`
    pub angle_degrees: f64,
}

/// Shape of the temperature distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionAnalysis {
    /// 10th percentile
    pub p10: f64,
    /// 25th percentile
    pub p25: f64,
    /// Median
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// Mean temperature
    pub mean: f64,
    /// Standard deviation
    pub std: f64,
    /// Skewness (third standardized moment)
    pub skewness: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
    /// Max minus min
    pub range: f64,
}

impl DistributionAnalysis {
    fn from_values(data: &[f64]) -> Self {
        let p = utils::percentiles(data, &[10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0]);
        Self {
            p10: p[0],
            p25: p[1],
            p50: p[2],
            p75: p[3],
            p90: p[4],
            p95: p[5],
            p99: p[6],
            mean: utils::mean(data),
            std: utils::std_dev(data),
            skewness: utils::skewness(data),
            kurtosis: utils::excess_kurtosis(data),
            range: utils::max(data) - utils::min(data),
        }
    }

    /// Returns `true` when at least two mining indicators are present:
    /// right skew, heavy tails, a wide range, or a hot upper tail.
    #[must_use]
    pub fn is_mining_like(&self) -> bool {
        let indicators = [
            self.skewness > 0.5,
            self.kurtosis > 2.0,
            self.range > 30.0,
            self.p95 > 60.0,
        ];
        indicators.iter().filter(|&&hit| hit).count() >= 2
    }
}

/// Condensed thermal findings carried in a detection result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalSummary {
    /// Hottest cell
    pub max_temperature: f64,
    /// Mean temperature
    pub mean_temperature: f64,
    /// Hot spot area ratio
    pub hot_spot_ratio: f64,
    /// Anomaly ratio
    pub anomaly_ratio: f64,
    /// Anomaly severity
    pub severity: AnomalySeverity,
    /// Number of linear patterns
    pub line_count: usize,
    /// Number of anomaly clusters
    pub cluster_count: usize,
}

/// Full analysis of one thermal frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalAnalysis {
    /// Basic statistics
    pub stats: ThermalStats,
    /// Gradient statistics
    pub gradients: GradientStats,
    /// Hot spots
    pub hot_spots: HotSpotStats,
    /// Anomalies and their clusters
    pub anomalies: ThermalAnomalies,
    /// Straight structures
    pub linear_patterns: Vec<LinearPattern>,
    /// Distribution shape
    pub distribution: DistributionAnalysis,
    /// Named thermal patterns that fired
    pub patterns: BTreeSet<ThermalPattern>,
}

impl ThermalAnalysis {
    /// Returns `true` if every cell has the same temperature.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.stats.std <= f64::EPSILON
    }

    /// Returns `true` if the named thermal pattern fired.
    #[must_use]
    pub fn has_pattern(&self, name: &str) -> bool {
        ThermalPattern::from_name(name).is_some_and(|p| self.patterns.contains(&p))
    }

    /// Condenses the analysis.
    #[must_use]
    pub fn summary(&self) -> ThermalSummary {
        ThermalSummary {
            max_temperature: self.stats.max,
            mean_temperature: self.stats.mean,
            hot_spot_ratio: self.hot_spots.area_ratio,
            anomaly_ratio: self.anomalies.ratio,
            severity: self.anomalies.severity,
            line_count: self.linear_patterns.len(),
            cluster_count: self.anomalies.clusters.len(),
        }
    }
}

// =============================================================================
// Named thermal patterns
// =============================================================================

/// Heat layouts characteristic of particular mining hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalPattern {
    /// A handful of evenly spread hot cells (GPU cards in a rig)
    GpuCluster,
    /// Strong spatial periodicity (rows of identical ASIC boards)
    AsicArray,
    /// Warm but very even frame (memory-hard workloads)
    MemoryIntensive,
    /// Several hot units well separated from each other
    ComputeUnits,
}

impl ThermalPattern {
    /// Every pattern in the table.
    pub const ALL: [ThermalPattern; 4] = [
        ThermalPattern::GpuCluster,
        ThermalPattern::AsicArray,
        ThermalPattern::MemoryIntensive,
        ThermalPattern::ComputeUnits,
    ];

    /// Catalogue name of the pattern.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GpuCluster => "gpu_cluster",
            Self::AsicArray => "asic_array",
            Self::MemoryIntensive => "memory_intensive",
            Self::ComputeUnits => "compute_units",
        }
    }

    /// Looks a pattern up by catalogue name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Evaluates the pattern on a frame.
    #[must_use]
    pub fn detect(&self, values: &Array2<f64>) -> bool {
        match self {
            Self::GpuCluster => gpu_cluster(values),
            Self::AsicArray => asic_array(values),
            Self::MemoryIntensive => memory_intensive(values),
            Self::ComputeUnits => compute_units(values),
        }
    }
}

fn cells_above(values: &Array2<f64>, threshold: f64) -> Vec<[f64; 2]> {
    values
        .indexed_iter()
        .filter(|&(_, &v)| v > threshold)
        .map(|((r, c), _)| cell_point(r, c))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn cell_point(row: usize, col: usize) -> [f64; 2] {
    [col as f64, row as f64]
}

fn stride_sample<T: Copy>(items: &[T], limit: usize) -> Vec<T> {
    if items.len() <= limit {
        return items.to_vec();
    }
    let stride = items.len().div_ceil(limit);
    items.iter().step_by(stride).copied().collect()
}

fn pairwise_distances(points: &[[f64; 2]]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len() * points.len().saturating_sub(1) / 2);
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            distances.push(planar_distance(a, b));
        }
    }
    distances
}

fn gpu_cluster(values: &Array2<f64>) -> bool {
    let flat: Vec<f64> = values.iter().copied().collect();
    let hot = cells_above(values, utils::percentile(&flat, 90.0));
    if hot.len() <= 3 {
        return false;
    }
    let distances = pairwise_distances(&stride_sample(&hot, PAIRWISE_SAMPLE_LIMIT));
    let mean = utils::mean(&distances);
    mean > 0.0 && utils::std_dev(&distances) / mean < 0.5
}

fn asic_array(values: &Array2<f64>) -> bool {
    let magnitude = fft2_magnitude(values);
    let max = magnitude.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return false;
    }
    find_peaks(&magnitude, 0.3 * max, 0.0).len() > 5
}

fn memory_intensive(values: &Array2<f64>) -> bool {
    let flat: Vec<f64> = values.iter().copied().collect();
    let mean = utils::mean(&flat);
    let std = utils::std_dev(&flat);
    mean > 0.0 && std > 0.0 && std / mean < 0.3
}

fn compute_units(values: &Array2<f64>) -> bool {
    let flat: Vec<f64> = values.iter().copied().collect();
    let hot = cells_above(values, utils::percentile(&flat, 85.0));
    if hot.len() <= 2 {
        return false;
    }
    pairwise_distances(&stride_sample(&hot, PAIRWISE_SAMPLE_LIMIT))
        .into_iter()
        .fold(f64::INFINITY, f64::min)
        > 20.0
}

/// Magnitude of the 2-D DFT, row-major.
fn fft2_magnitude(values: &Array2<f64>) -> Vec<f64> {
    let (rows, cols) = values.dim();
    let mut data: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();

    let mut planner = FftPlanner::new();
    let row_fft = planner.plan_fft_forward(cols);
    for row in data.chunks_exact_mut(cols) {
        row_fft.process(row);
    }

    let col_fft = planner.plan_fft_forward(rows);
    let mut column = vec![Complex64::default(); rows];
    for c in 0..cols {
        for (r, slot) in column.iter_mut().enumerate() {
            *slot = data[r * cols + c];
        }
        col_fft.process(&mut column);
        for (r, value) in column.iter().enumerate() {
            data[r * cols + c] = *value;
        }
    }

    data.iter().map(|z| z.norm()).collect()
}

// =============================================================================
// Analyzer
// =============================================================================

/// Thermal frame analyzer.
#[derive(Debug, Clone, Default)]
pub struct ThermalAnalyzer {
    config: ThermalAnalyzerConfig,
}

impl ThermalAnalyzer {
    /// Creates an analyzer, validating the configuration.
    pub fn new(config: ThermalAnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get configuration
    pub fn config(&self) -> &ThermalAnalyzerConfig {
        &self.config
    }

    /// Analyzes one thermal frame.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidGrid`] if the frame is too large to
    /// rasterise for line detection.
    pub fn analyze(&self, grid: &ThermalGrid) -> Result<ThermalAnalysis> {
        let values = grid.values();
        let flat: Vec<f64> = values.iter().copied().collect();

        let stats = ThermalStats {
            min: utils::min(&flat),
            max: utils::max(&flat),
            mean: utils::mean(&flat),
            std: utils::std_dev(&flat),
        };

        let gradients = self.gradient_stats(values);
        let hot_spots = self.hot_spots(&flat, &stats);
        let anomalies = self.anomalies(values, &stats);
        let linear_patterns = self.linear_patterns(values, &stats)?;
        let distribution = DistributionAnalysis::from_values(&flat);
        let patterns: BTreeSet<ThermalPattern> = ThermalPattern::ALL
            .into_iter()
            .filter(|p| p.detect(values))
            .collect();

        tracing::debug!(
            rows = grid.rows(),
            cols = grid.cols(),
            max_temp = stats.max,
            hot_spots = hot_spots.count,
            anomalies = anomalies.count,
            clusters = anomalies.clusters.len(),
            lines = linear_patterns.len(),
            patterns = patterns.len(),
            "Analyzed thermal frame"
        );

        Ok(ThermalAnalysis {
            stats,
            gradients,
            hot_spots,
            anomalies,
            linear_patterns,
            distribution,
            patterns,
        })
    }

    fn gradient_stats(&self, values: &Array2<f64>) -> GradientStats {
        let magnitude: Vec<f64> = gradient_magnitude(values).into_iter().collect();
        GradientStats {
            max_gradient: utils::max(&magnitude),
            mean_gradient: utils::mean(&magnitude),
            gradient_std: utils::std_dev(&magnitude),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn hot_spots(&self, flat: &[f64], stats: &ThermalStats) -> HotSpotStats {
        let threshold = stats.mean + self.config.hot_spot_sigma * stats.std;
        let hot: Vec<f64> = flat.iter().copied().filter(|&v| v > threshold).collect();
        HotSpotStats {
            threshold,
            count: hot.len(),
            area_ratio: hot.len() as f64 / flat.len().max(1) as f64,
            max_hot_spot_temp: utils::max(&hot),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn anomalies(&self, values: &Array2<f64>, stats: &ThermalStats) -> ThermalAnomalies {
        let threshold = stats.mean + self.config.anomaly_sigma * stats.std;
        let (positions, temps): (Vec<(usize, usize)>, Vec<f64>) = values
            .indexed_iter()
            .filter(|&(_, &v)| v > threshold)
            .map(|(rc, &v)| (rc, v))
            .unzip();

        let ratio = positions.len() as f64 / values.len().max(1) as f64;
        let severity = AnomalySeverity::from_ratio(
            ratio,
            self.config.severity_medium_ratio,
            self.config.severity_high_ratio,
        );

        let labels = grid_dbscan(
            &positions,
            values.dim(),
            self.config.anomaly_cluster_distance,
            self.config.anomaly_cluster_min_cells,
        );
        let clusters = group_labels(&labels)
            .into_iter()
            .filter(|members| members.len() >= self.config.anomaly_cluster_min_cells.max(2))
            .map(|members| {
                let n = members.len() as f64;
                let member_temps: Vec<f64> = members.iter().map(|&i| temps[i]).collect();
                let (sx, sy) = members.iter().fold((0.0, 0.0), |(sx, sy), &i| {
                    let [x, y] = cell_point(positions[i].0, positions[i].1);
                    (sx + x, sy + y)
                });
                AnomalyCluster {
                    size: members.len(),
                    centroid: (sx / n, sy / n),
                    max_temperature: utils::max(&member_temps),
                    mean_temperature: utils::mean(&member_temps),
                }
            })
            .collect();

        ThermalAnomalies {
            threshold,
            count: positions.len(),
            ratio,
            severity,
            clusters,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn linear_patterns(
        &self,
        values: &Array2<f64>,
        stats: &ThermalStats,
    ) -> Result<Vec<LinearPattern>> {
        let (rows, cols) = values.dim();
        let span = stats.max - stats.min;
        if rows < MIN_LINE_GRID_SIDE || cols < MIN_LINE_GRID_SIDE || span <= f64::EPSILON {
            return Ok(Vec::new());
        }

        let width = u32::try_from(cols)
            .map_err(|_| SignalError::InvalidGrid(format!("{cols} columns exceed raster width")))?;
        let height = u32::try_from(rows)
            .map_err(|_| SignalError::InvalidGrid(format!("{rows} rows exceed raster height")))?;

        let grey: Vec<u8> = values
            .iter()
            .map(|&v| ((v - stats.min) / span * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        let image = GrayImage::from_raw(width, height, grey)
            .ok_or_else(|| SignalError::InvalidGrid("raster buffer size mismatch".into()))?;

        let edges = canny(
            &image,
            self.config.canny_low as f32,
            self.config.canny_high as f32,
        );
        let lines = detect_lines(
            &edges,
            LineDetectionOptions {
                vote_threshold: self.config.hough_vote_threshold,
                suppression_radius: self.config.hough_suppression_radius,
            },
        );

        Ok(lines
            .iter()
            .filter_map(|line| clip_polar_line(line, cols as f64, rows as f64))
            .filter(|segment| segment.length > self.config.min_line_length)
            .collect())
    }
}

/// Gradient magnitude with central differences inside the frame and
/// one-sided differences at the borders.
fn gradient_magnitude(values: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = values.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let gy = axis_difference(rows, r, |i| values[[i, c]]);
        let gx = axis_difference(cols, c, |i| values[[r, i]]);
        gx.hypot(gy)
    })
}

fn axis_difference(len: usize, i: usize, at: impl Fn(usize) -> f64) -> f64 {
    if len < 2 {
        0.0
    } else if i == 0 {
        at(1) - at(0)
    } else if i == len - 1 {
        at(i) - at(i - 1)
    } else {
        (at(i + 1) - at(i - 1)) / 2.0
    }
}

/// Clips the line `x·cosθ + y·sinθ = r` to `[0, width-1] × [0, height-1]`.
fn clip_polar_line(line: &PolarLine, width: f64, height: f64) -> Option<LinearPattern> {
    const EPS: f64 = 1e-9;
    let theta = f64::from(line.angle_in_degrees).to_radians();
    let r = f64::from(line.r);
    let (sin, cos) = theta.sin_cos();
    let (x_max, y_max) = (width - 1.0, height - 1.0);

    let mut candidates = Vec::with_capacity(4);
    if sin.abs() > EPS {
        candidates.push((0.0, r / sin));
        candidates.push((x_max, (r - cos * x_max) / sin));
    }
    if cos.abs() > EPS {
        candidates.push((r / cos, 0.0));
        candidates.push(((r - sin * y_max) / cos, y_max));
    }

    let inside: Vec<(f64, f64)> = candidates
        .into_iter()
        .filter(|&(x, y)| (-EPS..=x_max + EPS).contains(&x) && (-EPS..=y_max + EPS).contains(&y))
        .map(|(x, y)| (x.clamp(0.0, x_max), y.clamp(0.0, y_max)))
        .collect();

    let mut best: Option<((f64, f64), (f64, f64), f64)> = None;
    for (i, &a) in inside.iter().enumerate() {
        for &b in &inside[i + 1..] {
            let length = (b.0 - a.0).hypot(b.1 - a.1);
            if best.map_or(true, |(_, _, l)| length > l) {
                best = Some((a, b, length));
            }
        }
    }

    best.filter(|&(_, _, length)| length > EPS)
        .map(|(start, end, length)| LinearPattern {
            start,
            end,
            length,
            angle_degrees: (end.1 - start.1).atan2(end.0 - start.0).to_degrees(),
        })
}
