use std::path::{Path, PathBuf};
use std::time::Duration;

use sandbox::ResourceLimits;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{BenchError, BenchResult};
use crate::provider::{ProviderKind, Probe};
use crate::runner::{Plan, RunMode};

pub(crate) const DEFAULT_READY_SECS: u64 = 120;
pub(crate) const DEFAULT_EXEC_SECS: u64 = 60;
pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Optional YAML file. Every key may be omitted.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub vm: VmConfig,
    pub timeouts: TimeoutConfig,
    pub endpoints: EndpointConfig,
}

/// Standardized sandbox shape applied to every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    pub vcpus: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
}

impl Default for VmConfig {
    fn default() -> Self {
        let limits = ResourceLimits::default();
        Self {
            vcpus: limits.vcpus,
            memory_mb: limits.memory_mb,
            disk_gb: limits.disk_gb,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub ready_secs: u64,
    pub exec_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ready_secs: DEFAULT_READY_SECS,
            exec_secs: DEFAULT_EXEC_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl TimeoutConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub morph: Option<String>,
    pub modal: Option<String>,
    pub runloop: Option<String>,
}

impl EndpointConfig {
    pub fn get(&self, kind: ProviderKind) -> Option<&String> {
        match kind {
            ProviderKind::Morph => self.morph.as_ref(),
            ProviderKind::Modal => self.modal.as_ref(),
            ProviderKind::Runloop => self.runloop.as_ref(),
        }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub iterations: u32,
    pub warmup: u32,
    pub providers: Vec<ProviderKind>,
    /// `true` when `--providers` was given rather than defaulted.
    pub providers_explicit: bool,
    pub strict: bool,
    pub mode: RunMode,
    pub output_dir: PathBuf,
    pub vm: VmConfig,
    pub timeouts: TimeoutConfig,
    pub endpoints: EndpointConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            warmup: 2,
            providers: ProviderKind::ALL.to_vec(),
            providers_explicit: false,
            strict: false,
            mode: RunMode::Sequential,
            output_dir: PathBuf::from("."),
            vm: VmConfig::default(),
            timeouts: TimeoutConfig::default(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Merge CLI flags over the optional config file and validate the result.
    pub async fn from_cli(cli: &Cli) -> BenchResult<Self> {
        let file = match &cli.config {
            Some(path) => load(path).await?,
            None => FileConfig::default(),
        };
        let config = Self::merge(cli, file);
        config.validate()?;
        Ok(config)
    }

    fn merge(cli: &Cli, file: FileConfig) -> Self {
        let mut providers = Vec::new();
        for kind in &cli.providers {
            if !providers.contains(kind) {
                providers.push(*kind);
            }
        }
        let providers_explicit = !providers.is_empty();
        if !providers_explicit {
            providers = ProviderKind::ALL.to_vec();
        }

        let mode = match cli.concurrency {
            Some(n) => RunMode::Batched {
                concurrency: n as usize,
            },
            None => RunMode::Sequential,
        };

        let output_dir = cli
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            iterations: cli.iterations,
            warmup: cli.warmup,
            providers,
            providers_explicit,
            strict: cli.strict,
            mode,
            output_dir,
            vm: file.vm,
            timeouts: file.timeouts,
            endpoints: file.endpoints,
        }
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.iterations == 0 {
            return Err(BenchError::Config("--iterations must be at least 1".into()));
        }
        if let RunMode::Batched { concurrency: 0 } = self.mode {
            return Err(BenchError::Config("--concurrency must be at least 1".into()));
        }
        if self.providers.is_empty() {
            return Err(BenchError::Config("no providers selected".into()));
        }
        if self.vm.vcpus == 0 || self.vm.memory_mb == 0 || self.vm.disk_gb == 0 {
            return Err(BenchError::Config(format!(
                "vm resources must be non-zero (vcpus={}, memory_mb={}, disk_gb={})",
                self.vm.vcpus, self.vm.memory_mb, self.vm.disk_gb
            )));
        }
        if self.timeouts.ready_secs == 0 || self.timeouts.exec_secs == 0 {
            return Err(BenchError::Config("timeouts must be non-zero".into()));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(BenchError::Config(
                "timeouts.poll_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn resources(&self) -> ResourceLimits {
        ResourceLimits {
            vcpus: self.vm.vcpus,
            memory_mb: self.vm.memory_mb,
            disk_gb: self.vm.disk_gb,
        }
    }

    pub fn probe(&self) -> Probe {
        Probe {
            resources: self.resources(),
            ready_timeout: Duration::from_secs(self.timeouts.ready_secs),
            exec_timeout: Duration::from_secs(self.timeouts.exec_secs),
        }
    }

    pub fn plan(&self) -> Plan {
        Plan {
            warmup: self.warmup,
            iterations: self.iterations,
            mode: self.mode,
        }
    }
}

/// Load a config file from YAML.
///
/// A relative `output_dir` is resolved against the config file's parent directory.
pub async fn load(path: &Path) -> BenchResult<FileConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BenchError::Config(format!("read {}: {e}", path.display())))?;
    let mut config: FileConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| BenchError::Config(format!("parse {}: {e}", path.display())))?;
    if let Some(config_dir) = path.parent()
        && let Some(dir) = &mut config.output_dir
        && dir.is_relative()
    {
        *dir = config_dir.join(&*dir);
    }
    Ok(config)
}
