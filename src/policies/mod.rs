pub mod arm;
mod gittins;
mod lookahead;
mod policy;
mod rng;
mod thompson_sampling;
mod ucb;

pub use arm::{ArmStats, BetaArm};
pub use gittins::Gittins;
pub use lookahead::{Choice, Lookahead, LookaheadSolver, LookaheadState, TieBreakRule};
pub use policy::{Policy, PolicyStats, PolicyType};
pub use rng::{FixedSequence, MaybeSeededRng, TieBreak};
pub use thompson_sampling::ThompsonSampling;
pub use ucb::{Ucb, DEFAULT_ALPHA, DEFAULT_INITIAL_MEAN};
