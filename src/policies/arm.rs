use serde::Serialize;

pub const NUM_ARMS: usize = 2;

/// Sufficient statistics of a Bernoulli arm under a Beta(1, 1) prior.
///
/// Both counts include the prior pseudo-count, so a fresh arm is (1, 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BetaArm {
    pub positive: u64,
    pub negative: u64,
}

impl Default for BetaArm {
    fn default() -> Self {
        Self {
            positive: 1,
            negative: 1,
        }
    }
}

impl BetaArm {
    /// Posterior mean of the success probability.
    pub fn mean(&self) -> f64 {
        self.positive as f64 / (self.positive + self.negative) as f64
    }

    pub fn pulls(&self) -> u64 {
        self.positive + self.negative - 2
    }

    /// State after observing one more outcome on this arm.
    pub fn successor(self, success: bool) -> Self {
        if success {
            Self {
                positive: self.positive + 1,
                ..self
            }
        } else {
            Self {
                negative: self.negative + 1,
                ..self
            }
        }
    }

    pub fn update(&mut self, success: bool) {
        *self = self.successor(success);
    }

    pub fn stats(&self) -> ArmStats {
        ArmStats {
            pulls: self.pulls(),
            mean_reward: self.mean(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ArmStats {
    pub pulls: u64,
    pub mean_reward: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior() {
        let arm = BetaArm::default();
        assert_eq!((arm.positive, arm.negative), (1, 1));
        assert_eq!(arm.pulls(), 0);
        assert_eq!(arm.mean(), 0.5);
    }

    #[test]
    fn update() {
        let mut arm = BetaArm::default();
        arm.update(true);
        arm.update(true);
        arm.update(false);
        assert_eq!((arm.positive, arm.negative), (3, 2));
        assert_eq!(arm.pulls(), 3);
        assert!((arm.mean() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn successor_leaves_original() {
        let arm = BetaArm::default();
        let next = arm.successor(false);
        assert_eq!(arm, BetaArm::default());
        assert_eq!(
            next,
            BetaArm {
                positive: 1,
                negative: 2
            }
        );
    }
}
