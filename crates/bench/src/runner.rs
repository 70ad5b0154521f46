use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::provider::ProviderAdapter;
use crate::record::{SampleSet, Trial, TrialOutcome};
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunMode {
    /// One trial at a time.
    Sequential,
    /// Up to `concurrency` trials in flight; each batch is joined before the next starts.
    Batched { concurrency: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub warmup: u32,
    pub iterations: u32,
    pub mode: RunMode,
}

impl Plan {
    fn phases(&self) -> [(Range<usize>, bool); 2] {
        let warmup = 0..self.warmup as usize;
        let measured = warmup.end..warmup.end + self.iterations as usize;
        [(warmup, true), (measured, false)]
    }
}

/// Run the warmup phase, then the measured phase, for one provider.
///
/// Every iteration produces exactly one trial, failed or not.
pub async fn run_provider(adapter: Arc<dyn ProviderAdapter>, plan: &Plan) -> SampleSet {
    let mut set = SampleSet::new(adapter.name());
    info!(
        provider = adapter.name(),
        warmup = plan.warmup,
        iterations = plan.iterations,
        mode = ?plan.mode,
        "benchmarking provider"
    );

    for (range, warmup) in plan.phases() {
        let trials = match plan.mode {
            RunMode::Sequential => run_sequential(&adapter, range, warmup).await,
            RunMode::Batched { concurrency } => {
                run_batched(&adapter, range, warmup, concurrency).await
            }
        };
        set.trials.extend(trials);
    }

    log_quick_summary(&set);
    set
}

async fn run_sequential(
    adapter: &Arc<dyn ProviderAdapter>,
    range: Range<usize>,
    warmup: bool,
) -> Vec<Trial> {
    let mut trials = Vec::with_capacity(range.len());
    for iteration in range {
        let trial = Trial::from_result(iteration, warmup, adapter.time_lifecycle().await);
        log_trial(adapter.name(), &trial);
        trials.push(trial);
    }
    trials
}

async fn run_batched(
    adapter: &Arc<dyn ProviderAdapter>,
    range: Range<usize>,
    warmup: bool,
    concurrency: usize,
) -> Vec<Trial> {
    let iterations: Vec<usize> = range.collect();
    let mut trials = Vec::with_capacity(iterations.len());

    for (batch_no, batch) in iterations.chunks(concurrency.max(1)).enumerate() {
        info!(
            provider = adapter.name(),
            batch = batch_no + 1,
            size = batch.len(),
            warmup,
            "launching batch"
        );

        let mut tasks = JoinSet::new();
        for &iteration in batch {
            let adapter = Arc::clone(adapter);
            tasks.spawn(async move { (iteration, adapter.time_lifecycle().await) });
        }

        let mut finished = Vec::with_capacity(batch.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((iteration, result)) => {
                    let trial = Trial::from_result(iteration, warmup, result);
                    log_trial(adapter.name(), &trial);
                    finished.push(trial);
                }
                Err(e) => error!(provider = adapter.name(), error = %e, "trial task panicked"),
            }
        }

        // A panicked task still counts as an attempt.
        for &iteration in batch {
            if !finished.iter().any(|t| t.iteration == iteration) {
                finished.push(Trial::failed(
                    iteration,
                    warmup,
                    format!("{}: trial task panicked", adapter.name()),
                ));
            }
        }
        finished.sort_by_key(|t| t.iteration);
        trials.extend(finished);
    }
    trials
}

fn log_trial(provider: &str, trial: &Trial) {
    match &trial.outcome {
        TrialOutcome::Success { duration_secs } => info!(
            provider,
            iteration = trial.iteration,
            warmup = trial.warmup,
            elapsed_secs = *duration_secs,
            "trial complete"
        ),
        TrialOutcome::Failure { error } => warn!(
            provider,
            iteration = trial.iteration,
            warmup = trial.warmup,
            error = %error,
            "trial failed"
        ),
    }
}

fn log_quick_summary(set: &SampleSet) {
    let mut sorted = set.measured_durations();
    if sorted.is_empty() {
        warn!(provider = %set.provider, "no successful measured trials");
        return;
    }
    sorted.sort_by(f64::total_cmp);
    info!(
        provider = %set.provider,
        mean = ?stats::mean(&sorted),
        median = ?stats::median(&sorted),
        best = ?sorted.first(),
        failures = set.measured_failures(),
        "provider finished"
    );
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use sandbox::{LifecycleError, LifecycleStep, SandboxError};

    use crate::provider::ProviderAdapter;

    /// Adapter that replays scripted outcomes (seconds or error text) in call order.
    pub struct ScriptedAdapter {
        name: String,
        outcomes: Mutex<VecDeque<Result<f64, String>>>,
        delay: Duration,
        pub calls: AtomicUsize,
        in_flight: AtomicUsize,
        pub peak_in_flight: AtomicUsize,
    }

    impl ScriptedAdapter {
        pub fn new(name: &str, outcomes: Vec<Result<f64, String>>) -> Self {
            Self {
                name: name.into(),
                outcomes: Mutex::new(outcomes.into()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn time_lifecycle(&self) -> Result<Duration, LifecycleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let next = self.outcomes.lock().unwrap().pop_front();
            match next.unwrap_or(Ok(0.1)) {
                Ok(secs) => Ok(Duration::from_secs_f64(secs)),
                Err(msg) => Err(LifecycleError {
                    provider: self.name.clone(),
                    step: LifecycleStep::Exec,
                    source: SandboxError::ExecFailed(msg),
                }),
            }
        }
    }
}
