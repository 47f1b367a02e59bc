//! Spectral Feature Extraction
//!
//! Converts a raw acoustic or RF sample buffer into a list of spectral peaks.
//! The buffer is transformed with a full-length DFT, bin frequencies follow
//! the usual `fftfreq` layout (positive bins first, then negative), and local
//! maxima of the magnitude spectrum are kept when both their height and their
//! prominence clear a threshold relative to the strongest bin.

use minesense_core::SampleBuffer;
use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::{Result, SignalError};

/// A local maximum of the magnitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeak {
    /// Bin frequency in Hz (negative for the mirrored half of real captures)
    pub frequency: f64,
    /// Magnitude `|X[k]|` at the bin
    pub amplitude: f64,
}

/// Thresholds for spectral peak picking, relative to the strongest bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakDetectionConfig {
    /// Minimum peak height as a fraction of the global maximum
    pub min_relative_height: f64,
    /// Minimum peak prominence as a fraction of the global maximum
    pub min_relative_prominence: f64,
}

impl Default for PeakDetectionConfig {
    fn default() -> Self {
        Self {
            min_relative_height: 0.1,
            min_relative_prominence: 0.05,
        }
    }
}

impl PeakDetectionConfig {
    /// Validates that both thresholds lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_relative_height", self.min_relative_height),
            ("min_relative_prominence", self.min_relative_prominence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SignalError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Extracts spectral peaks from a sample buffer.
///
/// Returns an empty list for an empty or all-zero buffer. The length check
/// comes first, so a one-sample buffer is rejected even when it is zero.
///
/// # Errors
///
/// - [`SignalError::BufferTooShort`] if the buffer holds exactly one sample,
///   whatever its value.
/// - [`SignalError::InvalidConfig`] if a relative threshold is outside `[0, 1]`.
pub fn extract_peaks(
    buffer: &SampleBuffer,
    min_relative_height: f64,
    min_relative_prominence: f64,
) -> Result<Vec<SpectralPeak>> {
    PeakDetectionConfig {
        min_relative_height,
        min_relative_prominence,
    }
    .validate()?;

    if buffer.len() == 1 {
        return Err(SignalError::BufferTooShort { len: 1, min: 2 });
    }
    if buffer.is_empty() || buffer.is_all_zero() {
        tracing::debug!(len = buffer.len(), "Buffer carries no signal, no peaks extracted");
        return Ok(Vec::new());
    }

    let magnitudes = magnitude_spectrum(buffer.samples());
    let global_max = magnitudes.iter().copied().fold(0.0, f64::max);
    if global_max <= 0.0 {
        return Ok(Vec::new());
    }

    let frequencies = fft_frequencies(
        buffer.len(),
        f64::from(buffer.sample_rate()),
        buffer.center_frequency(),
    );
    let indices = find_peaks(
        &magnitudes,
        min_relative_height * global_max,
        min_relative_prominence * global_max,
    );

    let peaks: Vec<SpectralPeak> = indices
        .into_iter()
        .map(|k| SpectralPeak {
            frequency: frequencies[k],
            amplitude: magnitudes[k],
        })
        .collect();

    tracing::debug!(
        samples = buffer.len(),
        peaks = peaks.len(),
        max_amplitude = global_max,
        "Extracted spectral peaks"
    );
    Ok(peaks)
}

/// Magnitude of the full-length DFT of a real signal.
#[must_use]
pub fn magnitude_spectrum(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(signal.len());

    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    fft.process(&mut buffer);

    buffer.iter().map(|c| c.norm()).collect()
}

/// Bin center frequencies for an `n`-point DFT, offset by `center`.
///
/// Bin `k` maps to `k·fs/n` for `k < ⌈n/2⌉` and to `(k−n)·fs/n` otherwise.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fft_frequencies(n: usize, sample_rate: f64, center: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let resolution = sample_rate / n as f64;
    let split = n.div_ceil(2);
    (0..n)
        .map(|k| {
            let signed = if k < split {
                k as f64
            } else {
                k as f64 - n as f64
            };
            center + signed * resolution
        })
        .collect()
}

/// Indices of local maxima with height of at least `min_height` and
/// prominence of at least `min_prominence`.
///
/// Endpoints are never peaks. A flat-topped maximum is reported once, at
/// the middle of the plateau (rounded down).
#[must_use]
pub fn find_peaks(data: &[f64], min_height: f64, min_prominence: f64) -> Vec<usize> {
    local_maxima(data)
        .into_iter()
        .filter(|&i| data[i] >= min_height)
        .filter(|&i| peak_prominence(data, i) >= min_prominence)
        .collect()
}

fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if data.len() < 3 {
        return maxima;
    }
    let last = data.len() - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Height of a peak above the higher of its two surrounding bases.
///
/// Each base is the lowest sample reached walking outwards from the peak
/// until a strictly higher sample or the end of the data.
#[must_use]
pub fn peak_prominence(data: &[f64], peak: usize) -> f64 {
    let height = data[peak];

    let mut left_min = height;
    for &v in data[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &data[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Peaks plus summary descriptors of their distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Extracted peaks in bin order
    pub peaks: Vec<SpectralPeak>,
    /// Amplitude-weighted mean frequency of the positive-frequency peaks
    pub spectral_centroid: f64,
    /// Amplitude-weighted spread around the centroid
    pub spectral_bandwidth: f64,
    /// Largest peak amplitude (0 when there are no peaks)
    pub max_amplitude: f64,
}

impl SpectralFeatures {
    /// Builds features from a peak list.
    #[must_use]
    pub fn from_peaks(peaks: Vec<SpectralPeak>) -> Self {
        let positive: Vec<&SpectralPeak> = peaks.iter().filter(|p| p.frequency > 0.0).collect();
        let weight: f64 = positive.iter().map(|p| p.amplitude).sum();

        let (spectral_centroid, spectral_bandwidth) = if weight > 0.0 {
            let centroid = positive
                .iter()
                .map(|p| p.frequency * p.amplitude)
                .sum::<f64>()
                / weight;
            let spread = positive
                .iter()
                .map(|p| (p.frequency - centroid).powi(2) * p.amplitude)
                .sum::<f64>()
                / weight;
            (centroid, spread.sqrt())
        } else {
            (0.0, 0.0)
        };

        let max_amplitude = peaks.iter().map(|p| p.amplitude).fold(0.0, f64::max);

        Self {
            peaks,
            spectral_centroid,
            spectral_bandwidth,
            max_amplitude,
        }
    }

    /// Returns `true` if no peak was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Peaks with positive frequency, in ascending frequency order.
    #[must_use]
    pub fn positive_peaks(&self) -> Vec<SpectralPeak> {
        let mut positive: Vec<SpectralPeak> = self
            .peaks
            .iter()
            .copied()
            .filter(|p| p.frequency > 0.0)
            .collect();
        positive.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        positive
    }
}

/// Spectral extractor bound to a peak detection configuration.
#[derive(Debug, Clone, Default)]
pub struct SpectralExtractor {
    config: PeakDetectionConfig,
}

impl SpectralExtractor {
    /// Creates an extractor, validating the configuration.
    pub fn new(config: PeakDetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Extracts peaks and summary descriptors from a buffer.
    pub fn extract(&self, buffer: &SampleBuffer) -> Result<SpectralFeatures> {
        let peaks = extract_peaks(
            buffer,
            self.config.min_relative_height,
            self.config.min_relative_prominence,
        )?;
        Ok(SpectralFeatures::from_peaks(peaks))
    }

    /// Get configuration
    pub fn config(&self) -> &PeakDetectionConfig {
        &self.config
    }
}
