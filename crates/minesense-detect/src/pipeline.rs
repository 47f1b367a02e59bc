//! Single-scan pipeline: extract, match, analyze, fuse, classify.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use minesense_core::{
    DegenerateDataWarning, DegenerateReason, GeoLocation, Modality, NetworkObservation,
    PowerReading, SampleBuffer, ThermalGrid,
};
use minesense_signal::{SpectralExtractor, ThermalAnalyzer};

use crate::catalogue::{CatalogueHandle, SignatureCatalogue};
use crate::domain::{DetectionId, DetectionResult, ModalityScore};
use crate::fusion::ConfidenceFusion;
use crate::matchers::{
    FrequencyMatcher, ModalityMatcher, NetworkMatcher, PowerMatcher, ThermalMatcher,
};
use crate::{DetectionConfig, Result};

/// Readings of one sensor site, taken together.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// When the readings were taken
    pub timestamp: DateTime<Utc>,
    /// Where the readings were taken
    pub location: Option<GeoLocation>,
    /// Acoustic capture
    pub acoustic: Option<SampleBuffer>,
    /// RF capture
    pub rf: Option<SampleBuffer>,
    /// Thermal frame
    pub thermal: Option<ThermalGrid>,
    /// Power reading
    pub power: Option<PowerReading>,
    /// Network fingerprint
    pub network: Option<NetworkObservation>,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanRequest {
    /// Empty request stamped now.
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            location: None,
            acoustic: None,
            rf: None,
            thermal: None,
            power: None,
            network: None,
        }
    }

    /// Set the capture time
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the acoustic capture
    pub fn with_acoustic(mut self, buffer: SampleBuffer) -> Self {
        self.acoustic = Some(buffer);
        self
    }

    /// Set the RF capture
    pub fn with_rf(mut self, buffer: SampleBuffer) -> Self {
        self.rf = Some(buffer);
        self
    }

    /// Set the thermal frame
    pub fn with_thermal(mut self, grid: ThermalGrid) -> Self {
        self.thermal = Some(grid);
        self
    }

    /// Set the power reading
    pub fn with_power(mut self, reading: PowerReading) -> Self {
        self.power = Some(reading);
        self
    }

    /// Set the network fingerprint
    pub fn with_network(mut self, observation: NetworkObservation) -> Self {
        self.network = Some(observation);
        self
    }

    /// Modalities present in the request.
    pub fn modalities(&self) -> Vec<Modality> {
        let present = [
            self.acoustic.is_some(),
            self.rf.is_some(),
            self.thermal.is_some(),
            self.power.is_some(),
            self.network.is_some(),
        ];
        Modality::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(m, p)| p.then_some(m))
            .collect()
    }
}

/// Runs one scan against a fixed catalogue snapshot.
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    catalogue: Arc<SignatureCatalogue>,
    config: DetectionConfig,
    extractor: SpectralExtractor,
    analyzer: ThermalAnalyzer,
    acoustic: FrequencyMatcher,
    rf: FrequencyMatcher,
    thermal: ThermalMatcher,
    power: PowerMatcher,
    network: NetworkMatcher,
    fusion: ConfidenceFusion,
}

impl ScanPipeline {
    /// Builds a pipeline, validating the configuration.
    pub fn new(catalogue: Arc<SignatureCatalogue>, config: DetectionConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            extractor: SpectralExtractor::new(config.peak_detection)?,
            analyzer: ThermalAnalyzer::new(config.thermal.clone())?,
            acoustic: FrequencyMatcher::acoustic(&config.matcher),
            rf: FrequencyMatcher::rf(&config.matcher),
            thermal: ThermalMatcher::new(&config.matcher),
            power: PowerMatcher::new(&config.matcher),
            network: NetworkMatcher::new(&config.matcher),
            fusion: ConfidenceFusion::new(config.fusion.clone(), config.severity.clone()),
            catalogue,
            config,
        })
    }

    /// Builds a pipeline over the handle's current catalogue.
    ///
    /// Catalogue swaps after this call are not seen by the pipeline.
    pub fn from_handle(handle: &CatalogueHandle, config: DetectionConfig) -> Result<Self> {
        Self::new(handle.snapshot(), config)
    }

    /// Get the catalogue snapshot
    pub fn catalogue(&self) -> &Arc<SignatureCatalogue> {
        &self.catalogue
    }

    /// Get the configuration
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Scans one request.
    ///
    /// # Errors
    ///
    /// Only structurally invalid input fails, e.g. a one-sample buffer.
    /// Absence of evidence yields a low-severity result with zero confidence.
    #[tracing::instrument(skip(self, request), fields(modalities = ?request.modalities()))]
    pub fn scan(&self, request: &ScanRequest) -> Result<DetectionResult> {
        let mut scores: Vec<ModalityScore> = Vec::new();
        let mut warnings = Vec::new();

        for (modality, buffer, matcher) in [
            (Modality::Acoustic, request.acoustic.as_ref(), &self.acoustic),
            (Modality::Rf, request.rf.as_ref(), &self.rf),
        ] {
            let Some(buffer) = buffer else { continue };
            if buffer.is_empty() {
                warnings.push(DegenerateDataWarning::new(modality, DegenerateReason::Empty));
            } else if buffer.is_all_zero() {
                warnings.push(DegenerateDataWarning::new(modality, DegenerateReason::AllZero));
            }
            let features = self.extractor.extract(buffer)?;
            scores.extend(matcher.match_features(&features, &self.catalogue));
        }

        let analysis = match &request.thermal {
            Some(grid) => {
                let analysis = self.analyzer.analyze(grid)?;
                if analysis.is_degenerate() {
                    warnings.push(DegenerateDataWarning::new(
                        Modality::Thermal,
                        DegenerateReason::ZeroVariance,
                    ));
                }
                scores.extend(self.thermal.match_features(&analysis, &self.catalogue));
                Some(analysis)
            }
            None => None,
        };

        if let Some(reading) = &request.power {
            if is_all_zero_power(reading) {
                warnings.push(DegenerateDataWarning::new(
                    Modality::Power,
                    DegenerateReason::AllZero,
                ));
            }
            scores.extend(self.power.match_features(reading, &self.catalogue));
        }

        if let Some(observation) = &request.network {
            scores.extend(self.network.match_features(observation, &self.catalogue));
        }

        for warning in &warnings {
            tracing::warn!(modality = %warning.modality, reason = %warning.reason, "Degenerate input");
        }

        let confidence = self.fusion.fuse(&scores, analysis.as_ref());
        let severity = self.fusion.classify(confidence);

        let result = DetectionResult {
            id: DetectionId::new(),
            timestamp: request.timestamp,
            location: request.location,
            modality_scores: scores,
            overall_confidence: confidence,
            severity,
            warnings,
            thermal_summary: analysis.as_ref().map(|a| a.summary()),
        };

        tracing::debug!(
            id = %result.id,
            confidence,
            severity = %severity,
            scores = result.modality_scores.len(),
            dominant = ?result.dominant_device_class(),
            "Scan complete"
        );
        Ok(result)
    }
}

fn is_all_zero_power(reading: &PowerReading) -> bool {
    reading.instantaneous == 0.0
        && reading.peak == 0.0
        && reading.average == 0.0
        && reading.samples.iter().all(|&s| s == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    fn pipeline() -> ScanPipeline {
        ScanPipeline::new(Arc::new(SignatureCatalogue::builtin()), DetectionConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_request_is_clear() {
        let result = pipeline().scan(&ScanRequest::new()).unwrap();
        assert_eq!(result.overall_confidence, 0.0);
        assert_eq!(result.severity, Severity::Low);
        assert!(result.is_clear());
        assert!(result.warnings.is_empty());
        assert!(result.thermal_summary.is_none());
    }

    #[test]
    fn test_silent_inputs_warn() {
        let request = ScanRequest::new()
            .with_acoustic(SampleBuffer::new(vec![0.0; 4096], 44_100).unwrap())
            .with_thermal(ThermalGrid::filled(24, 32, 25.0).unwrap())
            .with_power(PowerReading::new(0.0, 0.0, 0.0).unwrap());
        let result = pipeline().scan(&request).unwrap();

        assert_eq!(result.overall_confidence, 0.0);
        assert!(result.modality_scores.is_empty());
        let reasons: Vec<_> = result.warnings.iter().map(|w| (w.modality, w.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (Modality::Acoustic, DegenerateReason::AllZero),
                (Modality::Thermal, DegenerateReason::ZeroVariance),
                (Modality::Power, DegenerateReason::AllZero),
            ]
        );
        assert!(result.thermal_summary.is_some());
    }

    #[test]
    fn test_short_buffer_is_error() {
        let request = ScanRequest::new().with_rf(SampleBuffer::new(vec![0.5], 1_000_000).unwrap());
        let err = pipeline().scan(&request).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_request_modalities() {
        let request = ScanRequest::new()
            .with_power(PowerReading::new(1.0, 1.0, 1.0).unwrap())
            .with_network(NetworkObservation::default());
        assert_eq!(request.modalities(), vec![Modality::Power, Modality::Network]);
    }
}
