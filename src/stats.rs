//! Small descriptive-statistics helpers over `f64` slices.
//!
//! All helpers return `None` instead of dividing by zero or producing NaN, so
//! callers can treat "undefined" as an explicit state.

use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Sample standard deviation (n - 1), `None` below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().std_dev())
}

/// Population standard deviation (n), `None` for an empty slice
pub fn population_std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().population_std_dev())
}

/// Median, averaging the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is a fraction in [0, 1]. Matches the default "linear" method used by
/// most dataframe libraries, so p50 equals the median.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Coefficient of variation (sample std / mean)
///
/// `None` below two values; `Some(0.0)` when the mean is zero.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let std = sample_std(values)?;
    let mu = mean(values)?;
    if mu == 0.0 {
        return Some(0.0);
    }
    Some(std / mu)
}

/// Least-squares slope of `values` against their index
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let x_mean = mean(&xs)?;
    let y_mean = mean(values)?;

    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(values) {
        num += (x - x_mean) * (y - y_mean);
        den += (x - x_mean).powi(2);
    }
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Pearson correlation of two equally long series
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 3 {
        return None;
    }
    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;

    let mut cov = 0.0;
    let mut x_var = 0.0;
    let mut y_var = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - x_mean) * (y - y_mean);
        x_var += (x - x_mean).powi(2);
        y_var += (y - y_mean).powi(2);
    }
    if x_var == 0.0 || y_var == 0.0 {
        return None;
    }
    Some(cov / (x_var.sqrt() * y_var.sqrt()))
}

/// Clamp to [0, 1]
pub fn clip01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Round to a fixed number of decimals for reporting
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
