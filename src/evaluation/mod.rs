mod harness;
mod summary;

pub use harness::{ArmProbabilities, Evaluation, RegretMatrix, TrialSpec};
pub use summary::{ConfidenceSummary, Z_95};
