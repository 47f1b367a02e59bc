//! End-to-end scenarios for spectral extraction and thermal analysis.

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use minesense_core::{SampleBuffer, ThermalGrid};
use minesense_signal::prelude::*;
use minesense_signal::{extract_peaks, AnomalySeverity};
use ndarray::Array2;

fn hum_buffer(sample_rate: u32, seconds: u32) -> SampleBuffer {
    let n = (sample_rate * seconds) as usize;
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            (2.0 * PI * 100.0 * t).sin() + 0.5 * (2.0 * PI * 200.0 * t).sin()
        })
        .collect();
    SampleBuffer::new(samples, sample_rate).unwrap()
}

fn disk_frame() -> ThermalGrid {
    let values = Array2::from_shape_fn((240, 320), |(r, c)| {
        let d = (r as f64 - 120.0).hypot(c as f64 - 160.0);
        if d <= 40.0 {
            75.0
        } else {
            25.0
        }
    });
    ThermalGrid::new(values).unwrap()
}

#[test]
fn hum_at_100_and_200_hz_yields_both_peaks() {
    let buffer = hum_buffer(44_100, 1);
    let features = SpectralExtractor::default().extract(&buffer).unwrap();

    let positive = features.positive_peaks();
    assert_eq!(positive.len(), 2);
    assert_abs_diff_eq!(positive[0].frequency, 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(positive[1].frequency, 200.0, epsilon = 1e-9);
    assert!(positive[0].amplitude > positive[1].amplitude);
    assert!(features.spectral_centroid > 100.0 && features.spectral_centroid < 200.0);
}

#[test]
fn all_zero_buffer_has_no_peaks() {
    let buffer = SampleBuffer::new(vec![0.0; 44_100], 44_100).unwrap();
    assert!(extract_peaks(&buffer, 0.1, 0.05).unwrap().is_empty());

    let features = SpectralExtractor::default().extract(&buffer).unwrap();
    assert!(features.is_empty());
    assert_eq!(features.spectral_centroid, 0.0);
    assert_eq!(features.max_amplitude, 0.0);
}

#[test]
fn uniform_frame_is_quiet() {
    let grid = ThermalGrid::filled(240, 320, 25.0).unwrap();
    let analysis = ThermalAnalyzer::default().analyze(&grid).unwrap();

    assert_eq!(analysis.hot_spots.count, 0);
    assert!(analysis.anomalies.clusters.is_empty());
    assert!(analysis.linear_patterns.is_empty());
    assert!(!analysis.distribution.is_mining_like());
    assert_eq!(analysis.anomalies.severity, AnomalySeverity::Low);
}

#[test]
fn hot_disk_frame_reports_hot_spots() {
    let analysis = ThermalAnalyzer::default().analyze(&disk_frame()).unwrap();

    assert!(analysis.hot_spots.count > 0);
    assert_eq!(analysis.hot_spots.max_hot_spot_temp, 75.0);
    assert_eq!(analysis.anomalies.clusters.len(), 1);
    assert!(analysis.distribution.is_mining_like());
    assert!(analysis.hot_spots.area_ratio > 0.05);

    let summary = analysis.summary();
    assert_eq!(summary.max_temperature, 75.0);
    assert_eq!(summary.cluster_count, 1);
}
