//! Performance benchmarks for the MineSense detection path.
//!
//! Run with: cargo bench --package minesense-detect
//!
//! Benchmarks cover:
//! - Spectral peak extraction at various buffer lengths
//! - Thermal analysis at various frame sizes
//! - Full single-scan pipeline and batch scanning
//! - Hotspot clustering

use std::f64::consts::PI;
use std::sync::Arc;

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use ndarray::Array2;

use minesense_core::{GeoLocation, NetworkObservation, PowerReading, SampleBuffer, ThermalGrid};
use minesense_detect::{
    DetectionConfig, DetectionResult, ScanPipeline, ScanRequest, ScanScheduler, Severity,
    SignatureCatalogue, SpatialClusterAnalyzer,
};
use minesense_signal::{extract_peaks, ThermalAnalyzer};

// =============================================================================
// Test Data Generators
// =============================================================================

/// Fan harmonics plus pseudo-random noise
fn generate_hum(sample_rate: u32, num_samples: usize) -> SampleBuffer {
    let samples = (0..num_samples)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            let hum: f64 = [50.0, 100.0, 200.0, 400.0]
                .iter()
                .map(|f| (2.0 * PI * f * t).sin())
                .sum();
            let noise = (i as f64 * 12345.6789).sin() * 0.1;
            hum + noise
        })
        .collect();
    SampleBuffer::new(samples, sample_rate).unwrap()
}

/// Ambient frame with a grid of hot rectangles (rack of units)
fn generate_rack_frame(rows: usize, cols: usize) -> ThermalGrid {
    let values = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let unit = (r / 16) % 2 == 0 && (c / 24) % 2 == 0;
        let noise = ((r * cols + c) as f64 * 0.618).sin() * 0.5;
        if unit {
            68.0 + noise
        } else {
            24.0 + noise
        }
    });
    ThermalGrid::new(values).unwrap()
}

fn generate_request(index: usize) -> ScanRequest {
    ScanRequest::new()
        .with_location(GeoLocation::new(47.0 + index as f64 * 1e-4, 8.0).unwrap())
        .with_acoustic(generate_hum(44_100, 8192))
        .with_thermal(generate_rack_frame(120, 160))
        .with_power(PowerReading::new(2900.0, 3100.0, 2800.0).unwrap())
        .with_network(NetworkObservation::new(vec![22, 3333], vec!["stratum".into()]))
}

fn generate_detections(count: usize) -> Vec<DetectionResult> {
    (0..count)
        .map(|i| {
            // five sites with scattered members
            let site = (i % 5) as f64;
            let jitter = ((i as f64) * 0.37).sin() * 0.02;
            DetectionResult::new(
                Some(GeoLocation::new(site + jitter, site * 2.0 - jitter).unwrap()),
                Vec::new(),
                0.5 + jitter,
                Severity::Medium,
            )
        })
        .collect()
}

fn pipeline() -> ScanPipeline {
    ScanPipeline::new(Arc::new(SignatureCatalogue::builtin()), DetectionConfig::default()).unwrap()
}

// =============================================================================
// Feature Extraction Benchmarks
// =============================================================================

fn bench_spectral_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectral_extraction");

    for num_samples in [1024, 8192, 44_100] {
        let buffer = generate_hum(44_100, num_samples);

        group.throughput(Throughput::Elements(num_samples as u64));
        group.bench_with_input(
            BenchmarkId::new("extract_peaks", num_samples),
            &buffer,
            |b, buffer| b.iter(|| extract_peaks(black_box(buffer), 0.1, 0.05)),
        );
    }

    group.finish();
}

fn bench_thermal_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("thermal_analysis");
    group.sample_size(20);

    let analyzer = ThermalAnalyzer::default();
    for (rows, cols) in [(60, 80), (120, 160), (240, 320)] {
        let frame = generate_rack_frame(rows, cols);

        group.throughput(Throughput::Elements((rows * cols) as u64));
        group.bench_with_input(
            BenchmarkId::new("analyze", format!("{rows}x{cols}")),
            &frame,
            |b, frame| b.iter(|| analyzer.analyze(black_box(frame))),
        );
    }

    group.finish();
}

// =============================================================================
// Pipeline Benchmarks
// =============================================================================

fn bench_scan_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_pipeline");
    group.sample_size(20);

    let single = pipeline();
    let request = generate_request(0);
    group.bench_function("single_scan", |b| b.iter(|| single.scan(black_box(&request))));

    let scheduler = ScanScheduler::new(pipeline(), 0).unwrap();
    for batch in [4, 16] {
        let requests: Vec<ScanRequest> = (0..batch).map(generate_request).collect();

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("batch", batch), &requests, |b, requests| {
            b.iter(|| scheduler.run_batch(black_box(requests.clone())))
        });
    }

    group.finish();
}

// =============================================================================
// Clustering Benchmarks
// =============================================================================

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");

    let analyzer = SpatialClusterAnalyzer::default();
    for count in [50, 200, 1000] {
        let detections = generate_detections(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("dbscan", count),
            &detections,
            |b, detections| b.iter(|| analyzer.report(black_box(detections), 0.1, 3)),
        );
    }

    group.finish();
}

criterion_group!(
    name = extraction_benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(500))
        .measurement_time(std::time::Duration::from_secs(2));
    targets =
        bench_spectral_extraction,
        bench_thermal_analysis
);

criterion_group!(
    name = pipeline_benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(500))
        .measurement_time(std::time::Duration::from_secs(3));
    targets = bench_scan_pipeline
);

criterion_group!(
    name = clustering_benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_secs(1));
    targets = bench_clustering
);

criterion_main!(extraction_benches, pipeline_benches, clustering_benches);
