use super::arm::{BetaArm, NUM_ARMS};
use super::policy::{Policy, PolicyStats};
use super::rng::{argmax, MaybeSeededRng, TieBreak};

use crate::errors::PolicyError;
use crate::tables::GittinsTable;

use std::sync::Arc;

/// Pulls the arm with the larger precomputed Gittins index.
pub struct Gittins {
    arms: [BetaArm; NUM_ARMS],
    index: Arc<GittinsTable>,
    coin: Box<dyn TieBreak>,
}

impl Gittins {
    pub fn new(index: Arc<GittinsTable>, seed: Option<u64>) -> Self {
        Self {
            arms: [BetaArm::default(); NUM_ARMS],
            index,
            coin: Box::new(MaybeSeededRng::new(seed)),
        }
    }

    pub fn with_tie_break(mut self, coin: Box<dyn TieBreak>) -> Self {
        self.coin = coin;
        self
    }

    fn arm_index(&self, arm_id: usize) -> Result<f64, PolicyError> {
        let arm = &self.arms[arm_id];
        Ok(self.index.lookup(arm.positive, arm.negative)?)
    }
}

impl Policy for Gittins {
    fn choose(&mut self, _t: u64) -> Result<usize, PolicyError> {
        let indices = [self.arm_index(0)?, self.arm_index(1)?];
        Ok(argmax(indices, self.coin.as_mut()))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TableError;
    use crate::policies::rng::FixedSequence;

    const SEED: Option<u64> = Some(1234);

    // posterior mean plus a shrinking exploration bonus, enough to rank states
    fn make_index(max_pulls: u64) -> Arc<GittinsTable> {
        Arc::new(GittinsTable::from_fn(max_pulls, |p, n| {
            let total = (p + n) as f64;
            p as f64 / total + 0.5 / total
        }))
    }

    #[test]
    fn choose_best() {
        let mut policy = Gittins::new(make_index(10), SEED);
        policy.update(0, true).unwrap();
        policy.update(1, false).unwrap();
        assert_eq!(policy.choose(3).unwrap(), 0);

        (0..3).for_each(|_| policy.update(0, false).unwrap());
        assert_eq!(policy.choose(6).unwrap(), 1);
    }

    #[test]
    fn ties_use_coin() {
        let mut policy = Gittins::new(make_index(10), SEED)
            .with_tie_break(Box::new(FixedSequence::new(vec![1, 1, 0]).unwrap()));
        let choices: Vec<usize> = (1..=3).map(|t| policy.choose(t).unwrap()).collect();
        assert_eq!(choices, vec![1, 1, 0]);
    }

    #[test]
    fn missing_index_is_an_error() {
        let mut policy = Gittins::new(make_index(2), SEED);
        (0..3).for_each(|_| policy.update(0, true).unwrap());
        assert!(matches!(
            policy.choose(4),
            Err(PolicyError::Table(TableError::IndexNotFound {
                positive: 4,
                negative: 1
            }))
        ));
    }

    #[test]
    fn update() {
        let mut policy = Gittins::new(make_index(10), SEED);
        assert!(policy.update(0, true).is_ok());
        assert!(policy.update(1, false).is_ok());
        assert_eq!((policy.arms[0].positive, policy.arms[0].negative), (2, 1));
        assert_eq!((policy.arms[1].positive, policy.arms[1].negative), (1, 2));
        assert!(policy.update(2, true).is_err());
        assert_eq!(policy.stats().total_pulls(), 2);
    }

    #[test]
    fn mirrored_arms_give_mirrored_choices() {
        let coin = FixedSequence::new(vec![0, 1, 1, 0, 1]).unwrap();
        let mut policy =
            Gittins::new(make_index(30), SEED).with_tie_break(Box::new(coin.clone()));
        let mut mirror =
            Gittins::new(make_index(30), SEED).with_tie_break(Box::new(coin.mirrored()));

        let outcomes = [true, false, false, true, true, false, true, false, false, true];
        for (step, &success) in outcomes.iter().enumerate() {
            let t = step as u64 + 1;
            let arm_id = policy.choose(t).unwrap();
            let mirrored_id = mirror.choose(t).unwrap();
            assert_eq!(mirrored_id, 1 - arm_id);

            policy.update(arm_id, success).unwrap();
            mirror.update(mirrored_id, success).unwrap();
        }
    }
}
