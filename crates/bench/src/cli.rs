use std::path::PathBuf;

use clap::Parser;

use crate::provider::ProviderKind;

#[derive(Debug, Parser)]
#[command(
    name = "sandbox-bench",
    version,
    about = "Measure and compare sandbox cold-start latency across providers"
)]
pub struct Cli {
    /// Measured iterations per provider
    #[arg(long, default_value_t = 10)]
    pub iterations: u32,
    /// Warmup iterations per provider, excluded from statistics
    #[arg(long, default_value_t = 2)]
    pub warmup: u32,
    /// Providers to benchmark, comma separated (default: all)
    #[arg(long, value_enum, value_delimiter = ',', num_args = 1..)]
    pub providers: Vec<ProviderKind>,
    /// Run trials in batches of this many concurrent sandboxes
    #[arg(long)]
    pub concurrency: Option<u32>,
    /// Abort when any selected provider lacks credentials instead of skipping it
    #[arg(long)]
    pub strict: bool,
    /// Path to a YAML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    /// Directory for the JSON results file
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}
