use super::arm::{BetaArm, NUM_ARMS};
use super::policy::{Policy, PolicyStats};
use super::rng::MaybeSeededRng;

use crate::errors::PolicyError;

use rand::Rng;
use rand_distr::{Beta, Distribution};

fn sample<R: Rng + ?Sized>(arm: &BetaArm, rng: &mut R) -> Result<f64, PolicyError> {
    let s = Beta::new(arm.positive as f64, arm.negative as f64)
        .map_err(|e| PolicyError::SamplingError(e.to_string()))?
        .sample(rng);

    Ok(s)
}

#[derive(Debug)]
pub struct ThompsonSampling {
    arms: [BetaArm; NUM_ARMS],
    rng: MaybeSeededRng,
}

impl ThompsonSampling {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            arms: [BetaArm::default(); NUM_ARMS],
            rng: MaybeSeededRng::new(seed),
        }
    }
}

impl Policy for ThompsonSampling {
    fn choose(&mut self, _t: u64) -> Result<usize, PolicyError> {
        // continuous draws collide with probability zero, so no coin is needed
        let a = sample(&self.arms[0], self.rng.get_rng())?;
        let b = sample(&self.arms[1], self.rng.get_rng())?;

        Ok(if a > b { 0 } else { 1 })
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
            arms: self.arms.iter().map(BetaArm::stats).collect(),
        }
    }
}
