use crate::errors::{EvaluationError, PolicyError};
use crate::policies::Policy;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// True success probabilities (pA, pB) of one simulated problem.
pub type ArmProbabilities = (f64, f64);

/// Which problems to simulate, one trial per problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrialSpec {
    /// Draw both probabilities of every trial from Beta(1, 1).
    Random(usize),
    /// Explicit problems, in order.
    Pairs(Vec<ArmProbabilities>),
}

impl TrialSpec {
    /// Every ordered pair of `ticks` evenly spaced probabilities in [0, 1] with
    /// distinct values, each repeated `repetitions` times in a row.
    pub fn grid(ticks: usize, repetitions: usize) -> Self {
        let linspace = |i: usize| {
            if ticks > 1 {
                i as f64 / (ticks - 1) as f64
            } else {
                0.0
            }
        };

        let pairs = (0..ticks)
            .flat_map(|i| (0..ticks).map(move |j| (i, j)))
            .filter(|(i, j)| i != j)
            .flat_map(|(i, j)| std::iter::repeat_n((linspace(i), linspace(j)), repetitions))
            .collect();

        TrialSpec::Pairs(pairs)
    }

    pub fn len(&self) -> usize {
        match self {
            TrialSpec::Random(trials) => *trials,
            TrialSpec::Pairs(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<ArmProbabilities>, EvaluationError> {
        let problems = match self {
            TrialSpec::Random(trials) => {
                let prior = Beta::new(1.0, 1.0)
                    .map_err(|e| EvaluationError::SamplingError(e.to_string()))?;
                (0..*trials)
                    .map(|_| (prior.sample(rng), prior.sample(rng)))
                    .collect()
            }
            TrialSpec::Pairs(pairs) => pairs.clone(),
        };

        let valid = |p: f64| (0.0..=1.0).contains(&p);
        if let Some(&(a, b)) = problems.iter().find(|(a, b)| !valid(*a) || !valid(*b)) {
            return Err(EvaluationError::InvalidProbabilities(a, b));
        }

        Ok(problems)
    }
}

/// Cumulative expected regret, one row per trial and one column per time step.
#[derive(Clone, Debug, Serialize)]
pub struct RegretMatrix {
    horizon: usize,
    problems: Vec<ArmProbabilities>,
    regrets: Vec<f64>,
}

impl RegretMatrix {
    pub fn trials(&self) -> usize {
        self.problems.len()
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn row(&self, trial: usize) -> &[f64] {
        &self.regrets[trial * self.horizon..(trial + 1) * self.horizon]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.regrets.chunks_exact(self.horizon)
    }

    pub fn get(&self, trial: usize, step: usize) -> Option<f64> {
        if trial < self.trials() && step < self.horizon {
            Some(self.regrets[trial * self.horizon + step])
        } else {
            None
        }
    }

    pub fn problems(&self) -> &[ArmProbabilities] {
        &self.problems
    }

    /// Gap |pA - pB| of every trial.
    pub fn deltas(&self) -> Vec<f64> {
        self.problems.iter().map(|(a, b)| (a - b).abs()).collect()
    }

    /// Regret accumulated over the whole horizon, per trial.
    pub fn final_regrets(&self) -> Vec<f64> {
        self.rows().filter_map(|row| row.last().copied()).collect()
    }
}

/// Monte-Carlo evaluation of a policy over independent trials.
#[derive(Clone, Debug)]
pub struct Evaluation {
    horizon: u64,
    trials: TrialSpec,
    seed: Option<u64>,
    parallel: bool,
}

impl Evaluation {
    pub fn new(horizon: u64, trials: TrialSpec) -> Self {
        Self {
            horizon,
            trials,
            seed: None,
            parallel: true,
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs one trial per problem with a fresh policy from `factory`.
    ///
    /// The factory receives a seed derived from the base seed and the trial
    /// index, so a seeded evaluation is reproducible whether or not it runs
    /// in parallel.
    pub fn run<F>(&self, factory: F) -> Result<RegretMatrix, EvaluationError>
    where
        F: Fn(u64) -> Box<dyn Policy + Send> + Sync,
    {
        if self.horizon == 0 {
            return Err(EvaluationError::EmptyHorizon);
        }

        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let problems = self.trials.resolve(&mut SmallRng::seed_from_u64(seed))?;
        info!(
            trials = %problems.len(),
            horizon = %self.horizon,
            seed = %seed,
            parallel = %self.parallel,
            "Starting evaluation"
        );

        let start = Instant::now();
        let simulate = |(trial, &problem): (usize, &ArmProbabilities)| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(trial as u64 + 1));
            let policy = factory(rng.random());
            run_trial(policy, problem, self.horizon, &mut rng).map_err(|(step, source)| {
                EvaluationError::Trial {
                    trial,
                    step,
                    source,
                }
            })
        };

        let rows: Vec<Vec<f64>> = if self.parallel {
            problems
                .par_iter()
                .enumerate()
                .map(simulate)
                .collect::<Result<_, _>>()?
        } else {
            problems
                .iter()
                .enumerate()
                .map(simulate)
                .collect::<Result<_, _>>()?
        };

        info!(
            trials = %rows.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Finished evaluation"
        );

        Ok(RegretMatrix {
            horizon: self.horizon as usize,
            problems,
            regrets: rows.into_iter().flatten().collect(),
        })
    }
}

/// Drives one policy for `horizon` steps and returns its cumulative expected regret.
///
/// Regret is measured against the true probabilities, not the sampled outcomes.
fn run_trial<R: Rng + ?Sized>(
    mut policy: Box<dyn Policy + Send>,
    (a, b): ArmProbabilities,
    horizon: u64,
    rng: &mut R,
) -> Result<Vec<f64>, (u64, PolicyError)> {
    let probabilities = [a, b];
    let best = a.max(b);
    let mut cumulative = 0.0;

    let regrets = (1..=horizon)
        .map(|t| -> Result<f64, (u64, PolicyError)> {
            let arm_id = policy.choose(t).map_err(|e| (t, e))?;
            let p = *probabilities
                .get(arm_id)
                .ok_or((t, PolicyError::ArmNotFound(arm_id)))?;
            let success = rng.random_bool(p);
            policy.update(arm_id, success).map_err(|e| (t, e))?;

            cumulative += best - p;
            Ok(cumulative)
        })
        .collect::<Result<Vec<f64>, _>>()?;

    debug!(p_a = %a, p_b = %b, regret = %cumulative, "Finished trial");
    Ok(regrets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::{FixedSequence, Gittins, Lookahead, PolicyStats, ThompsonSampling, Ucb};
    use crate::tables::{GittinsTable, ValueTable};
    use std::sync::Arc;

    const SEED: u64 = 1234;

    /// Always pulls the same arm.
    struct Constant(usize);

    impl Policy for Constant {
        fn choose(&mut self, _t: u64) -> Result<usize, PolicyError> {
            Ok(self.0)
        }

        fn update(&mut self, arm_id: usize, _success: bool) -> Result<(), PolicyError> {
            if arm_id < 2 {
                Ok(())
            } else {
                Err(PolicyError::ArmNotFound(arm_id))
            }
        }

        fn stats(&self) -> PolicyStats {
            PolicyStats { arms: vec![] }
        }
    }

    fn gittins_index() -> Arc<GittinsTable> {
        Arc::new(GittinsTable::from_fn(200, |p, n| {
            let total = (p + n) as f64;
            p as f64 / total + (2.0 / total).sqrt() / 2.0
        }))
    }

    fn assert_valid(regrets: &RegretMatrix) {
        for row in regrets.rows() {
            assert!(row.iter().all(|&r| r >= 0.0));
            assert!(row.windows(2).all(|w| w[1] >= w[0]));
        }
    }

    #[test]
    fn constant_policy_regret() {
        let pairs = vec![(0.9, 0.1), (0.3, 0.6)];
        let evaluation = Evaluation::new(4, TrialSpec::Pairs(pairs)).seed(SEED);
        let regrets = evaluation.run(|_| Box::new(Constant(1))).unwrap();

        assert_eq!(regrets.trials(), 2);
        assert_eq!(regrets.horizon(), 4);
        let expected = [[0.8, 1.6, 2.4, 3.2], [0.0, 0.0, 0.0, 0.0]];
        for (row, expected) in regrets.rows().zip(expected) {
            row.iter()
                .zip(expected)
                .for_each(|(r, e)| assert!((r - e).abs() < 1e-9));
        }
        assert_eq!(regrets.get(1, 4), None);
    }

    #[test]
    fn empty_horizon() {
        let evaluation = Evaluation::new(0, TrialSpec::Random(3));
        assert!(matches!(
            evaluation.run(|_| Box::new(Constant(0))),
            Err(EvaluationError::EmptyHorizon)
        ));
    }

    #[test]
    fn invalid_probabilities() {
        let evaluation = Evaluation::new(3, TrialSpec::Pairs(vec![(0.5, 1.5)]));
        assert!(matches!(
            evaluation.run(|_| Box::new(Constant(0))),
            Err(EvaluationError::InvalidProbabilities(_, _))
        ));
    }

    #[test]
    fn policy_errors_carry_trial_and_step() {
        let evaluation = Evaluation::new(5, TrialSpec::Random(2))
            .seed(SEED)
            .parallel(false);
        let result = evaluation.run(|_| Box::new(Constant(3)));
        assert!(matches!(
            result,
            Err(EvaluationError::Trial {
                trial: 0,
                step: 1,
                source: PolicyError::ArmNotFound(3)
            })
        ));
    }

    #[test]
    fn table_too_shallow_for_horizon() {
        let index = Arc::new(GittinsTable::from_fn(3, |p, n| p as f64 / (p + n) as f64));
        let evaluation = Evaluation::new(10, TrialSpec::Random(1)).seed(SEED);
        let result = evaluation.run(|seed| Box::new(Gittins::new(index.clone(), Some(seed))));
        assert!(matches!(
            result,
            Err(EvaluationError::Trial {
                step: 5..=8,
                source: PolicyError::Table(_),
                ..
            })
        ));
    }

    #[test]
    fn random_problems_regret_is_cumulative() {
        let evaluation = Evaluation::new(50, TrialSpec::Random(40)).seed(SEED);
        let regrets = evaluation
            .run(|seed| Box::new(ThompsonSampling::new(Some(seed))))
            .unwrap();

        assert_eq!(regrets.trials(), 40);
        assert_eq!(regrets.final_regrets().len(), 40);
        assert!(regrets
            .problems()
            .iter()
            .all(|&(a, b)| (0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b)));
        assert_valid(&regrets);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = |parallel: bool| {
            Evaluation::new(30, TrialSpec::Random(16))
                .seed(SEED)
                .parallel(parallel)
                .run(|seed| Box::new(Ucb::new(2.0, 0.5, Some(seed))))
                .unwrap()
        };

        let sequential = run(false);
        let parallel = run(true);
        assert_eq!(sequential.problems(), parallel.problems());
        sequential
            .rows()
            .zip(parallel.rows())
            .for_each(|(a, b)| assert_eq!(a, b));
    }

    #[test]
    fn gittins_and_ucb_find_the_better_arm() {
        let index = gittins_index();
        let pairs = vec![(0.9, 0.1); 200];
        let evaluation = Evaluation::new(5, TrialSpec::Pairs(pairs)).seed(SEED);

        let gittins = evaluation
            .run(|seed| Box::new(Gittins::new(index.clone(), Some(seed))))
            .unwrap();
        let ucb = evaluation
            .run(|seed| Box::new(Ucb::new(2.0, 0.5, Some(seed))))
            .unwrap();

        for regrets in [gittins, ucb] {
            assert_valid(&regrets);
            let finals = regrets.final_regrets();
            // arm 1 costs 0.8 per pull: a strict majority of arm 0 means at most 2 bad pulls
            let majority = finals.iter().filter(|&&r| r < 2.0 * 0.8 + 1e-9).count();
            assert!(majority > 150, "only {majority} of 200 trials favoured arm 0");
            let mean = finals.iter().sum::<f64>() / finals.len() as f64;
            assert!(mean < 5.0 * 0.8);
        }
    }

    #[test]
    fn lookahead_runs_with_shared_table() {
        let values = Arc::new(ValueTable::from_fn(40, |t, p, n| {
            (40 - t) as f64 * p as f64 / (p + n) as f64 * 0.1
        }));
        let evaluation = Evaluation::new(20, TrialSpec::Random(8)).seed(SEED);
        let factory = |seed: u64| -> Box<dyn Policy + Send> {
            Box::new(Lookahead::with_stride(values.clone(), 3, 1.0, 2, Some(seed)))
        };
        let regrets = evaluation.run(factory).unwrap();
        assert_valid(&regrets);
    }

    #[test]
    fn mirrored_problems_give_identical_regret() {
        let index = gittins_index();
        let pairs = vec![(0.7, 0.4), (0.2, 0.55), (0.5, 0.5)];
        let mirrored = pairs.iter().map(|&(a, b)| (b, a)).collect();
        let coin = FixedSequence::new(vec![0, 1, 1, 0, 1]).unwrap();

        let run = |pairs: Vec<ArmProbabilities>, coin: FixedSequence| {
            Evaluation::new(60, TrialSpec::Pairs(pairs))
                .seed(SEED)
                .run(|seed| {
                    let policy = Gittins::new(index.clone(), Some(seed));
                    Box::new(policy.with_tie_break(Box::new(coin.clone())))
                })
                .unwrap()
        };
        let direct = run(pairs, coin.clone());
        let swapped = run(mirrored, coin.mirrored());

        // mirrored decisions pull arms with the same true probability, so the
        // outcome draws and the regret trajectories match exactly
        assert_eq!(direct.deltas(), swapped.deltas());
        direct
            .rows()
            .zip(swapped.rows())
            .for_each(|(a, b)| assert_eq!(a, b));
    }

    #[test]
    fn grid() {
        let spec = TrialSpec::grid(3, 2);
        let TrialSpec::Pairs(pairs) = &spec else {
            panic!("grid should produce explicit pairs");
        };
        assert_eq!(spec.len(), 3 * 2 * 2);
        assert!(pairs.iter().all(|(a, b)| a != b));
        assert_eq!(pairs[0], (0.0, 0.5));
        assert_eq!(pairs[1], (0.0, 0.5));
        assert_eq!(pairs[2], (0.0, 1.0));
        assert!(TrialSpec::grid(1, 5).is_empty());
    }
}
