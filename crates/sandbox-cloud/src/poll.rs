use std::future::Future;
use std::time::{Duration, Instant};

use sandbox::SandboxError;

pub(crate) enum Readiness {
    Pending,
    Ready,
    /// Terminal state that will never become ready.
    Failed(String),
}

/// Probe until the sandbox reports ready, a terminal state, or `timeout` elapses.
pub(crate) async fn wait_until_ready<F, Fut>(
    id: &str,
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> sandbox::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Readiness, String>>,
{
    let start = Instant::now();
    loop {
        match probe().await.map_err(SandboxError::CreationFailed)? {
            Readiness::Ready => return Ok(()),
            Readiness::Failed(state) => {
                return Err(SandboxError::CreationFailed(format!(
                    "sandbox {id} entered state {state}"
                )));
            }
            Readiness::Pending => {}
        }

        let waited = start.elapsed();
        if waited >= timeout {
            return Err(SandboxError::ReadyTimeout {
                id: id.to_string(),
                waited,
            });
        }
        tokio::time::sleep(interval.min(timeout - waited)).await;
    }
}
