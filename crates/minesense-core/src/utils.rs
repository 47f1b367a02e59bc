//! Descriptive statistics shared by the analyzers and matchers.
//!
//! Every function is total: an empty slice or a zero-variance input yields 0
//! rather than NaN, so the results can be summed into a confidence score
//! without further guarding.

/// Arithmetic mean, 0 for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance, 0 for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mu = mean(data);
    data.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / data.len() as f64
}

/// Population standard deviation, 0 for an empty slice.
#[must_use]
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Minimum value, 0 for an empty slice.
#[must_use]
pub fn min(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Maximum value, 0 for an empty slice.
#[must_use]
pub fn max(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Standard deviation divided by mean; 0 when the mean is not positive.
#[must_use]
pub fn coefficient_of_variation(data: &[f64]) -> f64 {
    let mu = mean(data);
    if mu <= f64::EPSILON {
        return 0.0;
    }
    std_dev(data) / mu
}

/// Third standardized moment, 0 when the standard deviation is 0.
#[must_use]
pub fn skewness(data: &[f64]) -> f64 {
    standardized_moment(data, 3)
}

/// Fourth standardized moment minus 3, 0 when the standard deviation is 0.
#[must_use]
pub fn excess_kurtosis(data: &[f64]) -> f64 {
    let sd = std_dev(data);
    if sd <= f64::EPSILON {
        return 0.0;
    }
    standardized_moment(data, 4) - 3.0
}

#[allow(clippy::cast_precision_loss)]
fn standardized_moment(data: &[f64], order: i32) -> f64 {
    let sd = std_dev(data);
    if data.is_empty() || sd <= f64::EPSILON {
        return 0.0;
    }
    let mu = mean(data);
    data.iter().map(|x| ((x - mu) / sd).powi(order)).sum::<f64>() / data.len() as f64
}

/// Percentile with linear interpolation between the closest ranks.
///
/// `p` is in percent and is clamped to `[0, 100]`. Returns 0 for an empty slice.
#[must_use]
pub fn percentile(data: &[f64], p: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

/// Several percentiles of the same data, sorting it once.
#[must_use]
pub fn percentiles(data: &[f64], ps: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    ps.iter().map(|&p| percentile_sorted(&sorted, p)).collect()
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
