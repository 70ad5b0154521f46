use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sandbox::{ExecRequest, LifecycleError, ResourceLimits, SandboxConfig, SandboxFactory};
use sandbox_cloud::{
    ModalConfig, ModalFactory, MorphConfig, MorphFactory, RunloopConfig, RunloopFactory,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::BenchConfig;
use crate::credentials::Credentials;

/// Script executed in every sandbox. Kept trivial so the measurement is
/// dominated by provisioning, not by the workload.
pub const TEST_SCRIPT: &str = r#"import sys
print(f"Python {sys.version_info.major}.{sys.version_info.minor} ready")
"#;

const SCRIPT_ARGS: &[&str] = &["-c", TEST_SCRIPT];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Morph,
    Modal,
    Runloop,
}

impl ProviderKind {
    pub const ALL: [Self; 3] = [Self::Morph, Self::Modal, Self::Runloop];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morph => "morph",
            Self::Modal => "modal",
            Self::Runloop => "runloop",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Morph => "Morph",
            Self::Modal => "Modal",
            Self::Runloop => "Runloop",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Environment variable overriding the API base URL.
    pub fn url_var(self) -> &'static str {
        match self {
            Self::Morph => "MORPH_API_URL",
            Self::Modal => "MODAL_API_URL",
            Self::Runloop => "RUNLOOP_API_URL",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only view of a provider the iteration runner has.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;
    /// Provision, run the test script, tear down. Failures are values.
    async fn time_lifecycle(&self) -> Result<Duration, LifecycleError>;
}

/// Per-sandbox knobs shared by every trial of a provider.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub resources: ResourceLimits,
    pub ready_timeout: Duration,
    pub exec_timeout: Duration,
}

/// [`ProviderAdapter`] backed by a started [`SandboxFactory`].
pub struct SandboxAdapter {
    factory: Box<dyn SandboxFactory>,
    probe: Probe,
}

impl SandboxAdapter {
    /// Run the factory's `startup()` and wrap it.
    pub async fn start(mut factory: Box<dyn SandboxFactory>, probe: Probe) -> sandbox::Result<Self> {
        factory.startup().await?;
        info!(provider = factory.name(), "provider ready");
        Ok(Self { factory, probe })
    }

    pub async fn shutdown(mut self) {
        self.factory.shutdown().await;
    }
}

#[async_trait]
impl ProviderAdapter for SandboxAdapter {
    fn name(&self) -> &str {
        self.factory.name()
    }

    async fn time_lifecycle(&self) -> Result<Duration, LifecycleError> {
        let config = SandboxConfig {
            id: Uuid::new_v4(),
            resources: self.probe.resources,
            ready_timeout: self.probe.ready_timeout,
        };
        let request = ExecRequest {
            program: "python3",
            args: SCRIPT_ARGS,
            timeout: self.probe.exec_timeout,
        };
        sandbox::time_lifecycle(self.factory.as_ref(), config, &request).await
    }
}

/// Build the (not yet started) factory for a provider.
///
/// The API base URL comes from the provider's `*_API_URL` variable, then the
/// config file, then the built-in default.
pub fn factory_for<E>(
    credentials: Credentials,
    config: &BenchConfig,
    env: &E,
) -> sandbox::Result<Box<dyn SandboxFactory>>
where
    E: Fn(&str) -> Option<String>,
{
    let kind = credentials.kind();
    let base_url = env(kind.url_var()).or_else(|| config.endpoints.get(kind).cloned());
    let poll_interval = config.timeouts.poll_interval();

    let factory: Box<dyn SandboxFactory> = match credentials {
        Credentials::Morph { api_key } => {
            let mut c = MorphConfig::new(api_key, config.resources());
            c.poll_interval = poll_interval;
            if let Some(url) = base_url {
                c.base_url = url;
            }
            Box::new(MorphFactory::new(c)?)
        }
        Credentials::Modal {
            token_id,
            token_secret,
        } => {
            let mut c = ModalConfig::new(token_id, token_secret);
            c.sandbox_timeout = Duration::from_secs(config.timeouts.exec_secs);
            if let Some(url) = base_url {
                c.base_url = url;
            }
            Box::new(ModalFactory::new(c)?)
        }
        Credentials::Runloop { api_key } => {
            let mut c = RunloopConfig::new(api_key);
            c.poll_interval = poll_interval;
            if let Some(url) = base_url {
                c.base_url = url;
            }
            Box::new(RunloopFactory::new(c)?)
        }
    };
    Ok(factory)
}
