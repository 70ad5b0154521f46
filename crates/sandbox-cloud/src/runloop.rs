use async_trait::async_trait;
use reqwest::Method;
use sandbox::{
    ExecRequest, ExecResult, ResourceLimits, Sandbox, SandboxConfig, SandboxError, SandboxFactory,
};
use serde::Deserialize;
use tracing::warn;

use crate::config::RunloopConfig;
use crate::http::{Auth, HttpClient, send_json, send_ok};
use crate::poll::{Readiness, wait_until_ready};

/// Runloop rejects CPU:memory ratios below 1:2 (GiB).
const MIN_GB_PER_CPU: u32 = 2;

#[derive(Deserialize)]
struct DevboxResponse {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    exit_status: Option<i32>,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
}

/// Memory in whole GiB, raised to the minimum Runloop accepts for the CPU count.
pub(crate) fn memory_gb(resources: &ResourceLimits) -> sandbox::Result<u32> {
    let floor = resources.vcpus.checked_mul(MIN_GB_PER_CPU).ok_or_else(|| {
        SandboxError::InvalidConfig(format!("vcpus {} is too large", resources.vcpus))
    })?;
    Ok(resources.memory_mb.div_ceil(1024).max(floor))
}

/// Runloop devboxes. No provider-level state, so `startup()` only checks the
/// API is reachable with the configured key.
pub struct RunloopFactory {
    config: RunloopConfig,
    http: HttpClient,
}

impl RunloopFactory {
    pub fn new(config: RunloopConfig) -> sandbox::Result<Self> {
        let http = HttpClient::new(&config.base_url, Auth::Bearer(config.api_key.clone()))?;
        Ok(Self { config, http })
    }

    async fn shutdown_devbox(&self, id: &str) -> Result<(), String> {
        let req = self
            .http
            .request(Method::POST, &format!("/v1/devboxes/{id}/shutdown"));
        send_ok(req, "shutdown devbox").await
    }
}

#[async_trait]
impl SandboxFactory for RunloopFactory {
    fn name(&self) -> &str {
        "runloop"
    }

    async fn startup(&mut self) -> sandbox::Result<()> {
        let req = self
            .http
            .request(Method::GET, "/v1/devboxes")
            .query(&[("limit", "1")]);
        send_ok(req, "list devboxes")
            .await
            .map_err(SandboxError::BackendNotAvailable)
    }

    async fn create(&self, config: SandboxConfig) -> sandbox::Result<Box<dyn Sandbox>> {
        let resources = config.resources;
        let memory = memory_gb(&resources)?;
        let req = self
            .http
            .request(Method::POST, "/v1/devboxes")
            .json(&serde_json::json!({
                "launch_parameters": {
                    "resource_size_request": "CUSTOM_SIZE",
                    "custom_cpu_cores": resources.vcpus,
                    "custom_gb_memory": memory,
                    "custom_disk_size": resources.disk_gb,
                },
                "metadata": { "benchmark_id": config.id.to_string() },
            }));
        let devbox: DevboxResponse = send_json(req, "create devbox")
            .await
            .map_err(SandboxError::CreationFailed)?;
        let id = devbox.id;

        let ready = wait_until_ready(&id, self.config.poll_interval, config.ready_timeout, || {
            let req = self.http.request(Method::GET, &format!("/v1/devboxes/{id}"));
            async move {
                let devbox: DevboxResponse = send_json(req, "get devbox").await?;
                Ok(match devbox.status.as_str() {
                    "running" => Readiness::Ready,
                    "failure" | "shutdown" => Readiness::Failed(devbox.status),
                    _ => Readiness::Pending,
                })
            }
        })
        .await;

        if let Err(e) = ready {
            if let Err(cleanup) = self.shutdown_devbox(&id).await {
                warn!(devbox = %id, error = %cleanup, "failed to shut down unready devbox");
            }
            return Err(e);
        }

        Ok(Box::new(RunloopSandbox {
            id,
            http: self.http.clone(),
        }))
    }

    async fn destroy(&self, sandbox: Box<dyn Sandbox>) -> sandbox::Result<()> {
        self.shutdown_devbox(sandbox.id())
            .await
            .map_err(SandboxError::TeardownFailed)
    }

    async fn shutdown(&mut self) {}
}

pub struct RunloopSandbox {
    id: String,
    http: HttpClient,
}

#[async_trait]
impl Sandbox for RunloopSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, request: &ExecRequest<'_>) -> sandbox::Result<ExecResult> {
        let req = self
            .http
            .request(
                Method::POST,
                &format!("/v1/devboxes/{}/execute_sync", self.id),
            )
            .timeout(request.timeout)
            .json(&serde_json::json!({ "command": request.shell_command() }));
        let resp: ExecuteResponse = send_json(req, "execute")
            .await
            .map_err(SandboxError::ExecFailed)?;

        let exit_code = resp.exit_status.ok_or_else(|| {
            SandboxError::ExecFailed(format!("devbox {} returned no exit status", self.id))
        })?;

        Ok(ExecResult {
            exit_code,
            stdout: resp.stdout,
            stderr: resp.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_rounds_up_to_whole_gb() {
        let r = ResourceLimits {
            vcpus: 1,
            memory_mb: 2500,
            disk_gb: 2,
        };
        assert_eq!(memory_gb(&r).unwrap(), 3);
    }

    #[test]
    fn memory_raised_to_cpu_ratio() {
        let r = ResourceLimits {
            vcpus: 2,
            memory_mb: 1024,
            disk_gb: 2,
        };
        assert_eq!(memory_gb(&r).unwrap(), 4);
    }

    #[test]
    fn default_profile_fits_ratio() {
        assert_eq!(memory_gb(&ResourceLimits::default()).unwrap(), 2);
    }

    #[test]
    fn oversized_cpu_count_is_invalid_config() {
        let r = ResourceLimits {
            vcpus: u32::MAX,
            memory_mb: 2048,
            disk_gb: 2,
        };
        let err = memory_gb(&r).unwrap_err();
        assert!(matches!(err, SandboxError::InvalidConfig(_)), "got: {err}");
    }
}
