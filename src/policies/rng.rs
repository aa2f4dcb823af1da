use super::arm::NUM_ARMS;

use crate::errors::PolicyError;

use rand::{rngs::SmallRng, Rng, SeedableRng};

#[derive(Debug)]
pub struct MaybeSeededRng {
    pub seed: Option<u64>,
    rng: SmallRng,
}

impl MaybeSeededRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            SmallRng::seed_from_u64(seed)
        } else {
            SmallRng::from_os_rng()
        };

        Self { seed, rng }
    }

    pub fn get_rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

/// Source of the fair coin used when two arms have exactly equal values.
pub trait TieBreak: Send {
    fn break_tie(&mut self) -> usize;
}

impl TieBreak for MaybeSeededRng {
    fn break_tie(&mut self) -> usize {
        self.rng.random_range(0..NUM_ARMS)
    }
}

/// Replays a fixed sequence of arms, cycling when exhausted.
#[derive(Clone, Debug)]
pub struct FixedSequence {
    arms: Vec<usize>,
    position: usize,
}

impl FixedSequence {
    /// Fails on an empty sequence or on an arm other than 0 or 1.
    pub fn new(arms: Vec<usize>) -> Result<Self, PolicyError> {
        if arms.is_empty() {
            return Err(PolicyError::EmptyTieBreakSequence);
        }
        if let Some(&arm) = arms.iter().find(|&&arm| arm >= NUM_ARMS) {
            return Err(PolicyError::ArmNotFound(arm));
        }

        Ok(Self { arms, position: 0 })
    }

    /// The same sequence with arm labels swapped.
    pub fn mirrored(&self) -> Self {
        Self {
            arms: self.arms.iter().map(|&arm| NUM_ARMS - 1 - arm).collect(),
            position: self.position,
        }
    }
}

impl TieBreak for FixedSequence {
    fn break_tie(&mut self) -> usize {
        let arm = self.arms[self.position % self.arms.len()];
        self.position += 1;
        arm
    }
}

/// Picks the larger value, deferring exact ties to the coin.
pub(crate) fn argmax<T: TieBreak + ?Sized>(values: [f64; NUM_ARMS], coin: &mut T) -> usize {
    if values[0] > values[1] {
        0
    } else if values[0] < values[1] {
        1
    } else {
        coin.break_tie()
    }
}
