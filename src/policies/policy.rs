use super::arm::ArmStats;
use super::gittins::Gittins;
use super::lookahead::{Lookahead, TieBreakRule};
use super::thompson_sampling::ThompsonSampling;
use super::ucb::{Ucb, DEFAULT_ALPHA, DEFAULT_INITIAL_MEAN};

use crate::errors::PolicyError;
use crate::tables::{Tables, ValueSource};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Serialize)]
pub struct PolicyStats {
    pub arms: Vec<ArmStats>,
}

impl PolicyStats {
    pub fn total_pulls(&self) -> u64 {
        self.arms.iter().map(|arm| arm.pulls).sum()
    }
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_initial_mean() -> f64 {
    DEFAULT_INITIAL_MEAN
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PolicyType {
    Ucb {
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default = "default_initial_mean")]
        initial_mean: f64,
    },
    ThompsonSampling,
    Gittins,
    Lookahead {
        values: ValueSource,
        depth: u32,
        #[serde(default = "default_scale")]
        scale: f64,
        #[serde(default)]
        stride: u32,
        #[serde(default)]
        tie_break: Option<TieBreakRule>,
    },
}

impl PolicyType {
    pub fn into_inner(&self, tables: &Tables, seed: Option<u64>) -> Box<dyn Policy + Send> {
        match *self {
            PolicyType::Ucb {
                alpha,
                initial_mean,
            } => Box::new(Ucb::new(alpha, initial_mean, seed)),
            PolicyType::ThompsonSampling => Box::new(ThompsonSampling::new(seed)),
            PolicyType::Gittins => Box::new(Gittins::new(tables.gittins_index.clone(), seed)),
            PolicyType::Lookahead {
                values,
                depth,
                scale,
                stride,
                tie_break,
            } => {
                let values = tables.values(values);
                let policy = Lookahead::with_stride(values, depth, scale, stride, seed);
                match tie_break {
                    Some(rule) => Box::new(policy.tie_break_rule(rule)),
                    None => Box::new(policy),
                }
            }
        }
    }

    /// Whether the tables this policy reads cover every lookup of a `horizon`-step trial.
    ///
    /// A lookahead of depth `d` reads values up to time `horizon - 1 + d`.
    pub fn covered_by(&self, tables: &Tables, horizon: u64) -> bool {
        let last = horizon.saturating_sub(1);
        match *self {
            PolicyType::Gittins => tables.gittins_index.covers(last),
            PolicyType::Lookahead { values, depth, .. } => {
                tables.values(values).covers(last + u64::from(depth))
            }
            PolicyType::Ucb { .. } | PolicyType::ThompsonSampling => true,
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PolicyType::Ucb { alpha, .. } => write!(f, "UCB(alpha={alpha})"),
            PolicyType::ThompsonSampling => write!(f, "Thompson"),
            PolicyType::Gittins => write!(f, "Gittins"),
            PolicyType::Lookahead {
                values,
                depth,
                stride,
                ..
            } => write!(f, "Lookahead({values:?}, depth={depth}, stride={stride})"),
        }
    }
}

/// A two-armed bandit strategy.
///
/// `choose` receives the 1-based index of the upcoming decision and returns
/// the arm to pull, 0 or 1. `update` feeds back the outcome of that pull.
pub trait Policy: Send {
    fn choose(&mut self, t: u64) -> Result<usize, PolicyError>;
    fn update(&mut self, arm_id: usize, success: bool) -> Result<(), PolicyError>;
    fn stats(&self) -> PolicyStats;
}
