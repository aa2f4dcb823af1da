use two_armed_bandits::config::AppConfig;
use two_armed_bandits::errors::AppError;
use two_armed_bandits::evaluation::{ConfidenceSummary, Evaluation};
use two_armed_bandits::tables::Tables;

use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct PolicySummary {
    policy: String,
    trials: usize,
    horizon: usize,
    final_mean: f64,
    final_half_width: f64,
}

fn run(config: AppConfig) -> Result<(), AppError> {
    let tables = Tables::load(
        &config.tables.ucb_values,
        &config.tables.gittins_values,
        &config.tables.gittins_index,
    )?;

    let horizon = config.evaluation.horizon;
    for policy_type in &config.policies {
        if !policy_type.covered_by(&tables, horizon) {
            warn!(policy = %policy_type, horizon = %horizon, "Tables do not cover the horizon");
        }
    }

    let trials = config.evaluation.trial_spec()?;
    let mut evaluation = Evaluation::new(horizon, trials).parallel(config.evaluation.parallel);
    if let Some(seed) = config.evaluation.seed {
        evaluation = evaluation.seed(seed);
    }

    for policy_type in &config.policies {
        info!(policy = %policy_type, "Evaluating policy");
        let regrets = evaluation.run(|seed| policy_type.into_inner(&tables, Some(seed)))?;
        let summary = ConfidenceSummary::from_regrets(&regrets);
        let (final_mean, final_half_width) = summary.final_regret().unwrap_or((0.0, 0.0));

        let line = serde_json::to_string(&PolicySummary {
            policy: policy_type.to_string(),
            trials: regrets.trials(),
            horizon: regrets.horizon(),
            final_mean,
            final_half_width,
        })?;
        println!("{line}");
    }

    Ok(())
}

fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Cannot read config: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if let Err(err) = run(config) {
        error!(error = %err, "Evaluation failed");
        std::process::exit(1);
    }
}
