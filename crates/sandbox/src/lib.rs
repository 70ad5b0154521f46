mod config;
mod error;
mod factory;
mod lifecycle;
mod sandbox;
mod types;

pub use config::{ResourceLimits, SandboxConfig};
pub use error::{Result, SandboxError};
pub use factory::SandboxFactory;
pub use lifecycle::{LifecycleError, LifecycleStep, time_lifecycle};
pub use sandbox::Sandbox;
pub use types::{ExecRequest, ExecResult};
