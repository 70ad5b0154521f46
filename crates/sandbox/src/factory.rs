use async_trait::async_trait;

use crate::config::SandboxConfig;
use crate::error::Result;
use crate::sandbox::Sandbox;

#[async_trait]
pub trait SandboxFactory: Send + Sync {
    /// Human-readable provider name (e.g. "morph").
    fn name(&self) -> &str;
    /// Acquire provider-level resources (snapshots, apps, ...).
    /// Must be called before `create()` or `destroy()`.
    async fn startup(&mut self) -> Result<()>;
    /// Provision a sandbox and wait until it accepts commands.
    async fn create(&self, config: SandboxConfig) -> Result<Box<dyn Sandbox>>;
    /// Tear down a sandbox. A failure means the remote sandbox may still be running.
    async fn destroy(&self, sandbox: Box<dyn Sandbox>) -> Result<()>;
    /// Release provider-level resources acquired in `startup()`.
    /// Requires exclusive ownership; recover it with `Arc::try_unwrap` when shared.
    async fn shutdown(&mut self);
}
