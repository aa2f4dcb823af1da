use super::harness::RegretMatrix;

use serde::Serialize;

/// Two-sided 95% quantile of the standard normal distribution.
pub const Z_95: f64 = 1.96;

/// Running mean and variance of one column (Welford).
#[derive(Clone, Copy, Debug, Default)]
struct ColumnStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl ColumnStats {
    fn add(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    fn variance_population(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.m2 / self.n as f64
        }
    }
}

/// Mean regret per time step with a 95% normal confidence half-width.
#[derive(Clone, Debug, Serialize)]
pub struct ConfidenceSummary {
    pub trials: usize,
    pub mean: Vec<f64>,
    pub half_width: Vec<f64>,
}

impl ConfidenceSummary {
    /// Summarises each column of `regrets`.
    ///
    /// The half-width is `1.96 * std / sqrt(trials)` with the population
    /// standard deviation. An empty matrix gives empty vectors.
    pub fn from_regrets(regrets: &RegretMatrix) -> Self {
        let trials = regrets.trials();
        if trials == 0 {
            return Self {
                trials,
                mean: Vec::new(),
                half_width: Vec::new(),
            };
        }

        let mut columns = vec![ColumnStats::default(); regrets.horizon()];
        for row in regrets.rows() {
            for (column, &r) in columns.iter_mut().zip(row) {
                column.add(r);
            }
        }

        let root_n = (trials as f64).sqrt();
        Self {
            trials,
            mean: columns.iter().map(|column| column.mean).collect(),
            half_width: columns
                .iter()
                .map(|column| Z_95 * column.variance_population().sqrt() / root_n)
                .collect(),
        }
    }

    pub fn lower(&self) -> Vec<f64> {
        self.mean
            .iter()
            .zip(&self.half_width)
            .map(|(m, h)| m - h)
            .collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.mean
            .iter()
            .zip(&self.half_width)
            .map(|(m, h)| m + h)
            .collect()
    }

    /// Mean and half-width at the last time step.
    pub fn final_regret(&self) -> Option<(f64, f64)> {
        let mean = self.mean.last()?;
        let half_width = self.half_width.last()?;
        Some((*mean, *half_width))
    }
}
