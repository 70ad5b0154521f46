use async_trait::async_trait;
use reqwest::Method;
use sandbox::{ExecRequest, ExecResult, Sandbox, SandboxConfig, SandboxError, SandboxFactory};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::MorphConfig;
use crate::http::{Auth, HttpClient, send_json, send_ok};
use crate::poll::{Readiness, wait_until_ready};

#[derive(Deserialize)]
struct SnapshotResponse {
    id: String,
}

#[derive(Deserialize)]
struct InstanceResponse {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct ExecResponse {
    exit_code: i32,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
}

/// Morph Cloud instances booted from a snapshot taken once at `startup()`.
pub struct MorphFactory {
    config: MorphConfig,
    http: HttpClient,
    snapshot_id: Option<String>,
}

impl MorphFactory {
    pub fn new(config: MorphConfig) -> sandbox::Result<Self> {
        let http = HttpClient::new(&config.base_url, Auth::Bearer(config.api_key.clone()))?;
        Ok(Self {
            config,
            http,
            snapshot_id: None,
        })
    }

    async fn delete_instance(&self, id: &str) -> Result<(), String> {
        let req = self
            .http
            .request(Method::DELETE, &format!("/instance/{id}"));
        send_ok(req, "delete instance").await
    }
}

#[async_trait]
impl SandboxFactory for MorphFactory {
    fn name(&self) -> &str {
        "morph"
    }

    async fn startup(&mut self) -> sandbox::Result<()> {
        if self.snapshot_id.is_some() {
            return Err(SandboxError::CreationFailed(
                "factory already started".into(),
            ));
        }

        let resources = self.config.resources;
        let disk_mb = resources.disk_gb.checked_mul(1024).ok_or_else(|| {
            SandboxError::InvalidConfig(format!("disk_gb {} is too large", resources.disk_gb))
        })?;
        let req = self
            .http
            .request(Method::POST, "/snapshot")
            .json(&serde_json::json!({
                "image_id": self.config.image_id,
                "vcpus": resources.vcpus,
                "memory": resources.memory_mb,
                "disk_size": disk_mb,
            }));
        let snapshot: SnapshotResponse = send_json(req, "create snapshot")
            .await
            .map_err(SandboxError::BackendNotAvailable)?;

        info!(snapshot_id = %snapshot.id, image = %self.config.image_id, "morph snapshot ready");
        self.snapshot_id = Some(snapshot.id);
        Ok(())
    }

    async fn create(&self, config: SandboxConfig) -> sandbox::Result<Box<dyn Sandbox>> {
        let snapshot_id = self
            .snapshot_id
            .as_deref()
            .ok_or_else(|| SandboxError::CreationFailed("factory not started".into()))?;

        let req = self
            .http
            .request(Method::POST, "/instance")
            .query(&[("snapshot_id", snapshot_id)]);
        let instance: InstanceResponse = send_json(req, "start instance")
            .await
            .map_err(SandboxError::CreationFailed)?;
        let id = instance.id;

        let ready = wait_until_ready(&id, self.config.poll_interval, config.ready_timeout, || {
            let req = self.http.request(Method::GET, &format!("/instance/{id}"));
            async move {
                let instance: InstanceResponse = send_json(req, "get instance").await?;
                Ok(match instance.status.as_str() {
                    "ready" => Readiness::Ready,
                    "error" | "stopped" => Readiness::Failed(instance.status),
                    _ => Readiness::Pending,
                })
            }
        })
        .await;

        if let Err(e) = ready {
            if let Err(cleanup) = self.delete_instance(&id).await {
                warn!(instance = %id, error = %cleanup, "failed to delete unready instance");
            }
            return Err(e);
        }

        Ok(Box::new(MorphSandbox {
            id,
            http: self.http.clone(),
        }))
    }

    async fn destroy(&self, sandbox: Box<dyn Sandbox>) -> sandbox::Result<()> {
        self.delete_instance(sandbox.id())
            .await
            .map_err(SandboxError::TeardownFailed)
    }

    async fn shutdown(&mut self) {
        let Some(id) = self.snapshot_id.take() else {
            return;
        };
        let req = self
            .http
            .request(Method::DELETE, &format!("/snapshot/{id}"));
        if let Err(e) = send_ok(req, "delete snapshot").await {
            warn!(snapshot_id = %id, error = %e, "failed to delete morph snapshot");
        }
    }
}

pub struct MorphSandbox {
    id: String,
    http: HttpClient,
}

#[async_trait]
impl Sandbox for MorphSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, request: &ExecRequest<'_>) -> sandbox::Result<ExecResult> {
        let req = self
            .http
            .request(Method::POST, &format!("/instance/{}/exec", self.id))
            .timeout(request.timeout)
            .json(&serde_json::json!({ "command": request.argv() }));
        let resp: ExecResponse = send_json(req, "exec")
            .await
            .map_err(SandboxError::ExecFailed)?;

        Ok(ExecResult {
            exit_code: resp.exit_code,
            stdout: resp.stdout,
            stderr: resp.stderr,
        })
    }
}
