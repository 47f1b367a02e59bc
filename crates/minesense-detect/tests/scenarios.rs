//! End-to-end detection scenarios.

use std::f64::consts::PI;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use minesense_detect::prelude::*;
use minesense_detect::{CatalogueError, PowerMatcher};
use ndarray::Array2;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("minesense_detect=debug")
        .with_test_writer()
        .try_init();
}

fn tone(freqs: &[f64], sample_rate: u32, n: usize) -> SampleBuffer {
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum()
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

fn bitcoin_only_catalogue() -> SignatureCatalogue {
    SignatureCatalogue::new(vec![DeviceSignature::new(
        "bitcoin",
        Modality::Acoustic,
        0.9,
    )
    .with_frequencies([100.0, 200.0])])
    .unwrap()
}

fn pipeline(catalogue: SignatureCatalogue) -> ScanPipeline {
    ScanPipeline::new(Arc::new(catalogue), DetectionConfig::default()).unwrap()
}

fn located(x: f64, y: f64, confidence: f64) -> DetectionResult {
    DetectionResult::new(
        Some(GeoLocation::new(y, x).unwrap()),
        Vec::new(),
        confidence,
        Severity::Low,
    )
}

#[test]
fn acoustic_hum_matches_bitcoin() {
    init_tracing();
    let request = ScanRequest::new().with_acoustic(tone(&[100.0, 200.0], 44_100, 44_100));
    let result = pipeline(bitcoin_only_catalogue()).scan(&request).unwrap();

    let score = result.score("bitcoin", Modality::Acoustic).unwrap();
    assert!(score.score > 0.3);
    assert!(score.has_evidence("100 Hz"));
    assert!(score.has_evidence("200 Hz"));
    assert_eq!(result.dominant_device_class(), Some("bitcoin"));
    assert_abs_diff_eq!(result.overall_confidence, 0.6, epsilon = 1e-9);
    assert_eq!(result.severity, Severity::Medium);
}

#[test]
fn silent_capture_yields_no_scores() {
    let request = ScanRequest::new().with_acoustic(SampleBuffer::new(vec![0.0; 4096], 44_100).unwrap());
    let result = pipeline(SignatureCatalogue::builtin()).scan(&request).unwrap();

    assert!(result.is_clear());
    assert_eq!(result.overall_confidence, 0.0);
    assert_eq!(result.severity, Severity::Low);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].reason, DegenerateReason::AllZero);
}

#[test]
fn hot_disk_frame_is_high_severity() {
    init_tracing();
    let request = ScanRequest::new()
        .with_location(GeoLocation::new(47.37, 8.54).unwrap())
        .with_thermal(disk_frame());
    let result = pipeline(SignatureCatalogue::builtin()).scan(&request).unwrap();

    assert!(result.scores_for(Modality::Thermal).count() > 0);
    assert!(result.score("bitcoin", Modality::Thermal).unwrap().has_evidence("mining_distribution"));
    assert!(result.overall_confidence >= 0.8);
    assert_eq!(result.severity, Severity::High);

    let summary = result.thermal_summary.unwrap();
    assert_eq!(summary.max_temperature, 75.0);
    assert!(summary.hot_spot_ratio > 0.05);
}

#[test]
fn combined_power_and_network_evidence() {
    let reading = PowerReading::new(3000.0, 3200.0, 2750.0)
        .unwrap()
        .with_series(vec![2750.0; 600], 1.0)
        .unwrap();
    let observation = NetworkObservation::new(vec![22, 3333], vec!["xmrig".into()]);
    let request = ScanRequest::new().with_power(reading.clone()).with_network(observation);
    let result = pipeline(SignatureCatalogue::builtin()).scan(&request).unwrap();

    assert_eq!(PowerMatcher::observed_load(&reading), 2750.0);
    assert!(result.scores_for(Modality::Power).count() > 0);
    let monero = result.score("monero", Modality::Network).unwrap();
    assert!(monero.has_evidence("service_xmrig"));
    assert!(monero.has_evidence("port_3333"));
    assert!(result.overall_confidence > 0.0);
}

#[test]
fn nearby_detections_form_one_hotspot() {
    let detections = vec![
        located(0.0, 0.0, 0.7),
        located(5.0, 0.0, 0.9),
        located(10_000.0, 0.0, 0.95),
    ];
    let report = SpatialClusterAnalyzer::default().report(&detections, 10.0, 2);

    assert_eq!(report.clusters.len(), 1);
    assert_eq!(report.clustered_detections, 2);
    assert_eq!(report.noise_detections, 1);
    let hottest = report.hottest().unwrap();
    assert_eq!(hottest.member_detections, vec![detections[0].id, detections[1].id]);
    assert_abs_diff_eq!(hottest.centroid.longitude, 2.5, epsilon = 1e-12);
}

#[test]
fn catalogue_json_round_trip() {
    let builtin = SignatureCatalogue::builtin();
    let json = builtin.to_json().unwrap();
    let parsed = SignatureCatalogue::from_json_str(&json).unwrap();
    assert_eq!(parsed, builtin);
}

#[test]
fn catalogue_file_loading() {
    let path = std::env::temp_dir().join(format!("minesense-catalogue-{}.json", DetectionId::new()));
    std::fs::write(&path, bitcoin_only_catalogue().to_json().unwrap()).unwrap();
    let loaded = SignatureCatalogue::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.len(), 1);

    assert!(matches!(
        SignatureCatalogue::from_json_file(&path),
        Err(DetectError::Io(_))
    ));
}

#[test]
fn invalid_catalogues_are_rejected() {
    let inverted = r#"{ "signatures": [
        { "device_class": "bitcoin", "modality": "thermal",
          "temperature_range": [90.0, 40.0], "base_confidence": 0.8 }
    ] }"#;
    assert!(matches!(
        SignatureCatalogue::from_json_str(inverted),
        Err(DetectError::Catalogue(CatalogueError::InvalidSignature { .. }))
    ));

    let unknown = r#"{ "signatures": [
        { "device_class": "bitcoin", "modality": "power",
          "wattage_range": { "normal_max": 500.0, "mining_max": 5000.0 },
          "pattern_names": ["gpu_cluster"], "base_confidence": 0.8 }
    ] }"#;
    assert!(matches!(
        SignatureCatalogue::from_json_str(unknown),
        Err(DetectError::Catalogue(CatalogueError::UnknownPattern { .. }))
    ));

    assert!(matches!(
        SignatureCatalogue::from_json_str(r#"{ "signatures": [] }"#),
        Err(DetectError::Catalogue(CatalogueError::Empty))
    ));
}

#[test]
fn catalogue_swap_only_affects_new_pipelines() {
    let handle = CatalogueHandle::default();
    let before = ScanPipeline::from_handle(&handle, DetectionConfig::default()).unwrap();

    let previous = handle.swap(bitcoin_only_catalogue());
    assert_eq!(previous.len(), SignatureCatalogue::builtin().len());

    let after = ScanPipeline::from_handle(&handle, DetectionConfig::default()).unwrap();
    assert_eq!(before.catalogue().len(), SignatureCatalogue::builtin().len());
    assert_eq!(after.catalogue().len(), 1);
}

#[test]
fn batch_results_keep_request_order() {
    init_tracing();
    let pipeline = pipeline(bitcoin_only_catalogue());
    let scheduler = ScanScheduler::new(pipeline, 4).unwrap();

    let requests: Vec<ScanRequest> = (0..12)
        .map(|i| {
            let request = ScanRequest::new().with_location(GeoLocation::new(0.0, f64::from(i)).unwrap());
            if i % 2 == 0 {
                request.with_acoustic(tone(&[100.0, 200.0], 8_000, 8_000))
            } else {
                request
            }
        })
        .collect();

    let results = scheduler.run_batch(requests);
    assert_eq!(results.len(), 12);
    for (i, result) in results.iter().enumerate() {
        let result = result.as_ref().unwrap();
        assert_eq!(result.location.unwrap().longitude, i as f64);
        assert_eq!(result.is_clear(), i % 2 == 1);
    }
}
