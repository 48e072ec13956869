//! Latency percentiles and performance confidence.
//!
//! Percentiles, deviation, and confidence come from the *successful
//! happy-path* subset only; the success rate is computed over every sample.

use vigil_types::{
    LatencySample, PerformanceConfidence, PerformanceConfidenceLevel, QuestionCategory,
};

/// Summary statistics for one tool's latency samples.
#[derive(Debug, Clone)]
pub struct PerformanceStats {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub mean_ms: Option<f64>,
    /// Successes over all samples; `None` when there are no samples at all.
    pub success_rate: Option<f64>,
    pub confidence: PerformanceConfidence,
}

/// Compute performance statistics over a tool's latency samples.
pub fn compute_performance(samples: &[LatencySample]) -> PerformanceStats {
    let baseline: Vec<f64> = samples
        .iter()
        .filter(|s| s.success && s.category == QuestionCategory::HappyPath)
        .map(|s| s.duration_ms)
        .collect();

    let success_rate = if samples.is_empty() {
        None
    } else {
        let successes = samples.iter().filter(|s| s.success).count();
        Some(successes as f64 / samples.len() as f64)
    };

    let mut sorted = baseline.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean = mean(&baseline);
    let stddev = population_stddev(&baseline, mean);
    let cv = match mean {
        Some(mean) if mean > 0.0 => stddev.unwrap_or(0.0) / mean,
        Some(_) => 0.0,
        None => 0.0,
    };

    let confidence = confidence_for(baseline.len(), cv, stddev.unwrap_or(0.0));

    PerformanceStats {
        p50_ms: percentile(&sorted, 50.0),
        p95_ms: percentile(&sorted, 95.0),
        p99_ms: percentile(&sorted, 99.0),
        mean_ms: mean,
        success_rate,
        confidence,
    }
}

/// Nearest-rank percentile over a pre-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[index])
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
fn population_stddev(values: &[f64], mean: Option<f64>) -> Option<f64> {
    let mean = mean?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

fn confidence_for(sample_count: usize, cv: f64, stddev: f64) -> PerformanceConfidence {
    let confidence_level = if sample_count >= 10 && cv <= 0.3 {
        PerformanceConfidenceLevel::High
    } else if sample_count >= 5 && cv <= 0.5 {
        PerformanceConfidenceLevel::Medium
    } else {
        PerformanceConfidenceLevel::Low
    };

    let recommendation = match confidence_level {
        PerformanceConfidenceLevel::High => None,
        PerformanceConfidenceLevel::Medium => {
            Some("collect at least 10 consistent happy-path samples for high confidence".into())
        }
        PerformanceConfidenceLevel::Low => Some(
            "too few or too variable happy-path samples; treat baseline timings as indicative only"
                .into(),
        ),
    };

    PerformanceConfidence {
        sample_count,
        standard_deviation: stddev,
        coefficient_of_variation: cv,
        confidence_level,
        recommendation,
    }
}
