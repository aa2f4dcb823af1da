//! Bounded-depth Bellman lookahead over the joint state of both arms.
//!
//! The search expands every outcome sequence up to `depth` pulls ahead and
//! scores the frontier with a per-arm value function that is linearly
//! separable across arms: `V(t, A) + V(t, B)`. Each expanded node is the
//! one-step Bellman expectation over a Bernoulli outcome under the arm's
//! posterior mean.
//!
//! With a non-zero `stride` the search commits to the same arm for `stride`
//! further simulated pulls after each decision. A committed node has two
//! children instead of four, which makes deeper searches affordable.

use super::arm::{BetaArm, NUM_ARMS};
use super::policy::{Policy, PolicyStats};
use super::rng::{MaybeSeededRng, TieBreak};

use crate::errors::PolicyError;
use crate::tables::ValueTable;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// How an exact tie between the two arms' q-values is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreakRule {
    /// Fair coin flip.
    Random,
    /// Always arm 0.
    PreferFirst,
}

/// Counts of both arms: (A positive, A negative), (B positive, B negative).
pub type LookaheadState = [BetaArm; NUM_ARMS];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Arm(usize),
    Tie,
}

impl Choice {
    fn compare(values: [f64; NUM_ARMS]) -> Self {
        if values[0] > values[1] {
            Choice::Arm(0)
        } else if values[0] < values[1] {
            Choice::Arm(1)
        } else {
            Choice::Tie
        }
    }
}

/// Recursive backward induction with a memo that lives for one decision.
pub struct LookaheadSolver {
    values: Arc<ValueTable>,
    scale: f64,
    stride: u32,
    // the committed arm is part of the key since it restricts the expansion
    cache: HashMap<(LookaheadState, Option<usize>), (Choice, f64)>,
}

impl LookaheadSolver {
    pub fn new(values: Arc<ValueTable>, scale: f64, stride: u32) -> Self {
        Self {
            values,
            scale,
            stride,
            cache: HashMap::new(),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn arm_value(&self, arm: &BetaArm, time: u64) -> Result<f64, PolicyError> {
        Ok(self.scale * self.values.lookup(time, arm.positive, arm.negative)?)
    }

    /// Picks the arm for `state` at 0-based `time`, searching `depth` pulls ahead.
    ///
    /// The cache is emptied first, so no entry from an earlier decision can
    /// leak into this one. A zero depth compares the arms' table values directly.
    pub fn decide(
        &mut self,
        state: LookaheadState,
        time: u64,
        depth: u32,
    ) -> Result<Choice, PolicyError> {
        self.cache.clear();

        if depth == 0 {
            let values = [
                self.arm_value(&state[0], time)?,
                self.arm_value(&state[1], time)?,
            ];
            return Ok(Choice::compare(values));
        }

        self.expand(state, time, depth, None, 0)
            .map(|(choice, _)| choice)
    }

    fn value(
        &mut self,
        state: LookaheadState,
        time: u64,
        steps_left: u32,
        fixed_action: Option<usize>,
        fixed_steps: u32,
    ) -> Result<f64, PolicyError> {
        if steps_left == 0 {
            let a = self.values.lookup(time, state[0].positive, state[0].negative)?;
            let b = self.values.lookup(time, state[1].positive, state[1].negative)?;
            return Ok(self.scale * (a + b));
        }

        self.expand(state, time, steps_left, fixed_action, fixed_steps)
            .map(|(_, value)| value)
    }

    fn expand(
        &mut self,
        state: LookaheadState,
        time: u64,
        steps_left: u32,
        fixed_action: Option<usize>,
        fixed_steps: u32,
    ) -> Result<(Choice, f64), PolicyError> {
        let (optimize, next_fixed_steps) = if fixed_steps == 0 {
            (true, self.stride)
        } else {
            (false, fixed_steps - 1)
        };

        let key = (state, if optimize { None } else { fixed_action });
        if let Some(&solution) = self.cache.get(&key) {
            return Ok(solution);
        }

        let mut q_values = [f64::NEG_INFINITY; NUM_ARMS];
        for arm_id in 0..NUM_ARMS {
            if optimize || fixed_action == Some(arm_id) {
                q_values[arm_id] =
                    self.q_value(state, arm_id, time, steps_left, next_fixed_steps)?;
            }
        }

        if q_values.iter().all(|&q| q == f64::NEG_INFINITY) {
            return Err(PolicyError::NoFeasibleAction {
                state: [
                    (state[0].positive, state[0].negative),
                    (state[1].positive, state[1].negative),
                ],
                time,
            });
        }

        let solution = (Choice::compare(q_values), q_values[0].max(q_values[1]));
        self.cache.insert(key, solution);
        Ok(solution)
    }

    fn q_value(
        &mut self,
        state: LookaheadState,
        arm_id: usize,
        time: u64,
        steps_left: u32,
        next_fixed_steps: u32,
    ) -> Result<f64, PolicyError> {
        let arm = state[arm_id];

        let mut success = state;
        success[arm_id] = arm.successor(true);
        let mut failure = state;
        failure[arm_id] = arm.successor(false);

        let (next_time, steps) = (time + 1, steps_left - 1);
        let v_success = self.value(success, next_time, steps, Some(arm_id), next_fixed_steps)?;
        let v_failure = self.value(failure, next_time, steps, Some(arm_id), next_fixed_steps)?;

        let p = arm.mean();
        Ok(p * (1.0 + v_success) + (1.0 - p) * v_failure)
    }
}

pub struct Lookahead {
    arms: LookaheadState,
    depth: u32,
    rule: TieBreakRule,
    solver: LookaheadSolver,
    coin: Box<dyn TieBreak>,
}

impl Lookahead {
    pub fn new(values: Arc<ValueTable>, depth: u32, scale: f64, seed: Option<u64>) -> Self {
        Self::with_stride(values, depth, scale, 0, seed)
    }

    /// Strided searches break exact ties towards arm 0 unless told otherwise.
    pub fn with_stride(
        values: Arc<ValueTable>,
        depth: u32,
        scale: f64,
        stride: u32,
        seed: Option<u64>,
    ) -> Self {
        let rule = if stride > 0 {
            TieBreakRule::PreferFirst
        } else {
            TieBreakRule::Random
        };

        Self {
            arms: [BetaArm::default(); NUM_ARMS],
            depth,
            rule,
            solver: LookaheadSolver::new(values, scale, stride),
            coin: Box::new(MaybeSeededRng::new(seed)),
        }
    }

    pub fn tie_break_rule(mut self, rule: TieBreakRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_tie_break(mut self, coin: Box<dyn TieBreak>) -> Self {
        self.coin = coin;
        self
    }
}

impl Policy for Lookahead {
    fn choose(&mut self, t: u64) -> Result<usize, PolicyError> {
        // tables use 0-based time
        let time = t.saturating_sub(1);

        match self.solver.decide(self.arms, time, self.depth)? {
            Choice::Arm(arm_id) => Ok(arm_id),
            Choice::Tie => match self.rule {
                TieBreakRule::Random => Ok(self.coin.break_tie()),
                TieBreakRule::PreferFirst => Ok(0),
            },
        }
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
