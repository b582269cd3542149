//! Summary Statistics
//!
//! Average is the arithmetic mean. Standard deviation uses the population
//! formula (divisor = sample count), so a single sample has zero spread.

/// Average and standard deviation of a sample set, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Arithmetic mean of the samples
    pub average: f64,
    /// Population standard deviation of the samples
    pub std_dev: f64,
    /// Number of samples the summary was computed from
    pub sample_count: usize,
}

impl Summary {
    /// The `(average, std_dev)` pair.
    pub fn to_pair(self) -> (f64, f64) {
        (self.average, self.std_dev)
    }
}

impl From<Summary> for (f64, f64) {
    fn from(summary: Summary) -> Self {
        summary.to_pair()
    }
}

/// Arithmetic mean; `0.0` for an empty slice.
pub fn average(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation; `0.0` for fewer than two samples.
pub fn std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mean = average(samples);
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

/// Compute the summary of a complete sample set
pub fn compute_summary(samples: &[f64]) -> Summary {
    Summary {
        average: average(samples),
        std_dev: std_dev(samples),
        sample_count: samples.len(),
    }
}
