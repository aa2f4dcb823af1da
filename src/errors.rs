use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("No value for time {time} and state ({positive}, {negative})")]
    ValueNotFound {
        time: u64,
        positive: u64,
        negative: u64,
    },
    #[error("No Gittins index for state ({positive}, {negative})")]
    IndexNotFound { positive: u64, negative: u64 },
    #[error("Invalid table row ({positive}, {negative}): counts start at 1")]
    InvalidRow { positive: u64, negative: u64 },
    #[error("I/O error while reading table: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse table from JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Arm {0} not found, expected 0 or 1")]
    ArmNotFound(usize),
    #[error("No feasible action in state {state:?} at time {time}")]
    NoFeasibleAction { state: [(u64, u64); 2], time: u64 },
    #[error("Sampling error: {0}")]
    SamplingError(String),
    #[error("Tie-break sequence is empty")]
    EmptyTieBreakSequence,
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Horizon must be positive")]
    EmptyHorizon,
    #[error("Invalid arm probabilities ({0}, {1})")]
    InvalidProbabilities(f64, f64),
    #[error("Sampling error: {0}")]
    SamplingError(String),
    #[error("Trial {trial} failed at step {step}: {source}")]
    Trial {
        trial: usize,
        step: u64,
        #[source]
        source: PolicyError,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("Failed to serialize summary: {0}")]
    Serialization(#[from] serde_json::Error),
}
