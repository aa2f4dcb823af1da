use super::arm::{ArmStats, NUM_ARMS};
use super::policy::{Policy, PolicyStats};
use super::rng::{argmax, MaybeSeededRng, TieBreak};

use crate::errors::PolicyError;

pub const DEFAULT_ALPHA: f64 = 2.0;
pub const DEFAULT_INITIAL_MEAN: f64 = 0.5;

#[derive(Clone, Debug)]
struct UcbArm {
    mean: f64,
    count: u64,
}

impl UcbArm {
    fn new(initial_mean: f64) -> Self {
        Self {
            mean: initial_mean,
            count: 1,
        }
    }

    fn upper_bound(&self, alpha: f64, t: u64) -> f64 {
        self.mean + (alpha * (t as f64).ln() / (2.0 * self.count as f64)).sqrt()
    }

    fn update(&mut self, success: bool) {
        let reward = if success { 1.0 } else { 0.0 };
        self.mean = (self.mean * self.count as f64 + reward) / (self.count + 1) as f64;
        self.count += 1;
    }

    fn stats(&self) -> ArmStats {
        ArmStats {
            pulls: self.count - 1,
            mean_reward: self.mean,
        }
    }
}

/// Upper confidence bound over a running mean.
///
/// Each arm starts with one pseudo-observation worth `initial_mean`. Exact ties
/// between the two bounds are broken by a coin flip so the result does not
/// depend on the order of the arms.
pub struct Ucb {
    arms: [UcbArm; NUM_ARMS],
    alpha: f64,
    coin: Box<dyn TieBreak>,
}

impl Ucb {
    pub fn new(alpha: f64, initial_mean: f64, seed: Option<u64>) -> Self {
        Self {
            arms: [UcbArm::new(initial_mean), UcbArm::new(initial_mean)],
            alpha,
            coin: Box::new(MaybeSeededRng::new(seed)),
        }
    }

    pub fn with_tie_break(mut self, coin: Box<dyn TieBreak>) -> Self {
        self.coin = coin;
        self
    }
}

impl Policy for Ucb {
    fn choose(&mut self, t: u64) -> Result<usize, PolicyError> {
        let bounds = [
            self.arms[0].upper_bound(self.alpha, t),
            self.arms[1].upper_bound(self.alpha, t),
        ];
        Ok(argmax(bounds, self.coin.as_mut()))
    }

    fn update(&mut self, arm_id: usize, success: bool) -> Result<(), PolicyError> {
        self.arms
            .get_mut(arm_id)
            .ok_or(PolicyError::ArmNotFound(arm_id))?
            .update(success);

        Ok(())
    }

    fn stats(&self) -> PolicyStats {
        PolicyStats {
            arms: self.arms.iter().map(UcbArm::stats).collect(),
        }
    }
}
