use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ExecRequest, ExecResult};

#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Provider-assigned identifier.
    fn id(&self) -> &str;

    /// Run a command to completion and return its captured output.
    async fn exec(&self, request: &ExecRequest<'_>) -> Result<ExecResult>;
}
