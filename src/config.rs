use crate::evaluation::{ArmProbabilities, TrialSpec};
use crate::policies::PolicyType;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct GridConfig {
    pub ticks: usize,
    pub repetitions: usize,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationConfig {
    pub horizon: u64,
    pub trials: Option<usize>,
    pub pairs: Option<Vec<ArmProbabilities>>,
    pub grid: Option<GridConfig>,
    pub seed: Option<u64>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl EvaluationConfig {
    /// Explicit pairs win over a grid, which wins over a random trial count.
    pub fn trial_spec(&self) -> Result<TrialSpec, ConfigError> {
        match (&self.pairs, &self.grid, self.trials) {
            (Some(pairs), _, _) => Ok(TrialSpec::Pairs(pairs.clone())),
            (None, Some(grid), _) => Ok(TrialSpec::grid(grid.ticks, grid.repetitions)),
            (None, None, Some(trials)) => Ok(TrialSpec::Random(trials)),
            (None, None, None) => Err(ConfigError::Message(
                "evaluation needs one of trials, pairs or grid".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TablesConfig {
    pub ucb_values: PathBuf,
    pub gittins_values: PathBuf,
    pub gittins_index: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub log_level: String,
    pub evaluation: EvaluationConfig,
    pub tables: TablesConfig,
    pub policies: Vec<PolicyType>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("log_level", "info")?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        builder.try_deserialize()
    }
}
