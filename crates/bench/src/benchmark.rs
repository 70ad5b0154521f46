use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::config::BenchConfig;
use crate::credentials::{self, Credentials};
use crate::error::BenchResult;
use crate::provider::{self, ProviderAdapter, ProviderKind, SandboxAdapter, TEST_SCRIPT};
use crate::record::{self, RecordConfig, RunRecord, SampleSet};
use crate::report::Report;
use crate::runner::{self, Plan};
use crate::stats::Summary;

/// Resolve configuration and credentials, benchmark every provider, print the
/// report and persist the run record.
pub async fn run_benchmark(cli: Cli) -> BenchResult<PathBuf> {
    let config = BenchConfig::from_cli(&cli).await?;
    let env = |name: &str| std::env::var(name).ok();
    let credentials = credentials::resolve(&config, &env)?;
    let providers: Vec<ProviderKind> = credentials.iter().map(Credentials::kind).collect();
    info!(
        providers = ?providers,
        iterations = config.iterations,
        warmup = config.warmup,
        mode = ?config.mode,
        "starting benchmark"
    );

    let started_at = Utc::now();
    let plan = config.plan();
    let mut samples = Vec::with_capacity(credentials.len());
    for creds in credentials {
        samples.push(bench_provider(creds, &config, &plan, &env).await);
    }
    let record = build_record(&config, providers, started_at, Utc::now(), samples);

    print!("{}", Report(&record));
    let path = record::persist(&record, &config.output_dir).await?;
    println!("\nResults saved to {}", path.display());
    Ok(path)
}

/// Prepare one provider, run its trials and shut it down.
///
/// A provider that cannot be prepared yields a sample set with no trials.
async fn bench_provider<E>(
    credentials: Credentials,
    config: &BenchConfig,
    plan: &Plan,
    env: &E,
) -> SampleSet
where
    E: Fn(&str) -> Option<String>,
{
    let kind = credentials.kind();
    let started = provider::factory_for(credentials, config, env);
    let adapter = match started {
        Ok(factory) => SandboxAdapter::start(factory, config.probe()).await,
        Err(e) => Err(e),
    };
    let adapter = match adapter {
        Ok(a) => Arc::new(a),
        Err(e) => {
            error!(provider = %kind, error = %e, "provider setup failed");
            return SampleSet::setup_failed(kind.as_str(), e.to_string());
        }
    };

    let set = runner::run_provider(Arc::clone(&adapter) as Arc<dyn ProviderAdapter>, plan).await;

    match Arc::try_unwrap(adapter) {
        Ok(adapter) => adapter.shutdown().await,
        Err(_) => warn!(provider = %kind, "adapter still in use, skipping shutdown"),
    }
    set
}

pub fn build_record(
    config: &BenchConfig,
    providers: Vec<ProviderKind>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    samples: Vec<SampleSet>,
) -> RunRecord {
    let summaries = samples.iter().map(Summary::from_samples).collect();
    RunRecord {
        started_at,
        finished_at,
        config: RecordConfig {
            iterations: config.iterations,
            warmup: config.warmup,
            providers,
            mode: config.mode,
            vm: config.vm,
            script: TEST_SCRIPT.to_string(),
        },
        samples,
        summaries,
    }
}
