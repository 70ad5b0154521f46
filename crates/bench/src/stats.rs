//! Summary statistics over one provider's measured durations.
//!
//! Percentiles use the nearest-rank method: sort ascending and take index
//! `ceil(p/100 * n) - 1`, clamped to `[0, n-1]`. The median is the middle
//! element for odd `n` and the mean of the two middle elements for even `n`.

use serde::Serialize;

use crate::record::SampleSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub provider: String,
    pub successes: usize,
    pub failures: usize,
    /// Statistics are `None` when there were no measured successes.
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

impl Summary {
    pub fn from_samples(set: &SampleSet) -> Self {
        let mut sorted = set.measured_durations();
        sorted.sort_by(f64::total_cmp);

        let mean = mean(&sorted);
        Self {
            provider: set.provider.clone(),
            successes: sorted.len(),
            failures: set.measured_failures(),
            mean,
            median: median(&sorted),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            std_dev: std_dev(&sorted, mean),
            p95: percentile(&sorted, 95),
            p99: percentile(&sorted, 99),
        }
    }
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation around `mean`.
fn std_dev(sorted: &[f64], mean: Option<f64>) -> Option<f64> {
    let mean = mean?;
    let (first, last) = (sorted.first()?, sorted.last()?);
    // Identical samples: avoid reporting rounding noise from the mean.
    if first >= last {
        return Some(0.0);
    }
    let variance =
        sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / sorted.len() as f64;
    Some(variance.sqrt())
}

/// Median of an ascending slice.
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted.get(mid).copied()
    } else {
        let lo = sorted.get(mid.checked_sub(1)?)?;
        let hi = sorted.get(mid)?;
        Some((lo + hi) / 2.0)
    }
}

/// Nearest-rank percentile of an ascending slice; `p` is in percent.
pub fn percentile(sorted: &[f64], p: u32) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let rank = (p as usize * n).div_ceil(100);
    let index = rank.saturating_sub(1).min(n - 1);
    sorted.get(index).copied()
}
