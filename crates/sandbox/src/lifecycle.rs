use std::fmt;
use std::time::{Duration, Instant};

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::factory::SandboxFactory;
use crate::types::ExecRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    Create,
    Exec,
    Result,
    Destroy,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Exec => "exec",
            Self::Result => "result",
            Self::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

/// A failed lifecycle, tagged with the provider and the step that broke.
#[derive(Debug, thiserror::Error)]
#[error("{provider}: {step} failed: {source}")]
pub struct LifecycleError {
    pub provider: String,
    pub step: LifecycleStep,
    pub source: SandboxError,
}

/// Create, exec, check, destroy. Returns the wall-clock time of the whole
/// sequence.
///
/// Once `create()` has succeeded, `destroy()` is always attempted. The first
/// failing step is the one reported; a teardown error only surfaces when
/// everything before it succeeded.
pub async fn time_lifecycle(
    factory: &dyn SandboxFactory,
    config: SandboxConfig,
    request: &ExecRequest<'_>,
) -> Result<Duration, LifecycleError> {
    let fail = |step: LifecycleStep, source: SandboxError| LifecycleError {
        provider: factory.name().to_string(),
        step,
        source,
    };

    let start = Instant::now();
    let sandbox = factory
        .create(config)
        .await
        .map_err(|e| fail(LifecycleStep::Create, e))?;

    let outcome = match sandbox.exec(request).await {
        Ok(result) if result.exit_code == 0 => Ok(()),
        Ok(result) => Err(fail(
            LifecycleStep::Result,
            SandboxError::NonZeroExit {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            },
        )),
        Err(e) => Err(fail(LifecycleStep::Exec, e)),
    };

    let teardown = factory.destroy(sandbox).await;
    let elapsed = start.elapsed();

    outcome?;
    teardown.map_err(|e| fail(LifecycleStep::Destroy, e))?;
    Ok(elapsed)
}
