use async_trait::async_trait;
use reqwest::Method;
use sandbox::{ExecRequest, ExecResult, Sandbox, SandboxConfig, SandboxError, SandboxFactory};
use serde::Deserialize;
use tracing::info;

use crate::config::ModalConfig;
use crate::http::{Auth, HttpClient, send_json, send_ok};

#[derive(Deserialize)]
struct AppResponse {
    app_id: String,
}

#[derive(Deserialize)]
struct SandboxResponse {
    sandbox_id: String,
}

#[derive(Deserialize)]
struct ProcessResponse {
    process_id: String,
}

#[derive(Deserialize)]
struct WaitResponse {
    exit_code: i32,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
}

/// Modal sandboxes scheduled under one app. Sandbox creation returns once the
/// container is running, so there is no readiness poll.
pub struct ModalFactory {
    config: ModalConfig,
    http: HttpClient,
    app_id: Option<String>,
}

impl ModalFactory {
    pub fn new(config: ModalConfig) -> sandbox::Result<Self> {
        let http = HttpClient::new(
            &config.base_url,
            Auth::TokenPair {
                id: config.token_id.clone(),
                secret: config.token_secret.clone(),
            },
        )?;
        Ok(Self {
            config,
            http,
            app_id: None,
        })
    }
}

#[async_trait]
impl SandboxFactory for ModalFactory {
    fn name(&self) -> &str {
        "modal"
    }

    async fn startup(&mut self) -> sandbox::Result<()> {
        if self.app_id.is_some() {
            return Err(SandboxError::CreationFailed(
                "factory already started".into(),
            ));
        }

        let req = self
            .http
            .request(Method::POST, "/apps/lookup")
            .json(&serde_json::json!({
                "name": self.config.app_name,
                "create_if_missing": true,
            }));
        let app: AppResponse = send_json(req, "lookup app")
            .await
            .map_err(SandboxError::BackendNotAvailable)?;

        info!(app_id = %app.app_id, app = %self.config.app_name, "modal app ready");
        self.app_id = Some(app.app_id);
        Ok(())
    }

    async fn create(&self, config: SandboxConfig) -> sandbox::Result<Box<dyn Sandbox>> {
        let app_id = self
            .app_id
            .as_deref()
            .ok_or_else(|| SandboxError::CreationFailed("factory not started".into()))?;

        let resources = config.resources;
        let req = self
            .http
            .request(Method::POST, "/sandboxes")
            .timeout(config.ready_timeout)
            .json(&serde_json::json!({
                "app_id": app_id,
                "cpu": f64::from(resources.vcpus),
                "memory_mb": resources.memory_mb,
                "timeout_secs": self.config.sandbox_timeout.as_secs(),
            }));
        let created: SandboxResponse = send_json(req, "create sandbox")
            .await
            .map_err(SandboxError::CreationFailed)?;

        Ok(Box::new(ModalSandbox {
            id: created.sandbox_id,
            http: self.http.clone(),
        }))
    }

    async fn destroy(&self, sandbox: Box<dyn Sandbox>) -> sandbox::Result<()> {
        let req = self.http.request(
            Method::POST,
            &format!("/sandboxes/{}/terminate", sandbox.id()),
        );
        send_ok(req, "terminate sandbox")
            .await
            .map_err(SandboxError::TeardownFailed)
    }

    async fn shutdown(&mut self) {
        // Apps are left in place.
        self.app_id = None;
    }
}

pub struct ModalSandbox {
    id: String,
    http: HttpClient,
}

#[async_trait]
impl Sandbox for ModalSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, request: &ExecRequest<'_>) -> sandbox::Result<ExecResult> {
        let req = self
            .http
            .request(Method::POST, &format!("/sandboxes/{}/exec", self.id))
            .json(&serde_json::json!({ "command": request.argv() }));
        let process: ProcessResponse = send_json(req, "exec")
            .await
            .map_err(SandboxError::ExecFailed)?;

        let req = self
            .http
            .request(
                Method::POST,
                &format!("/processes/{}/wait", process.process_id),
            )
            .timeout(request.timeout)
            .json(&serde_json::json!({ "timeout_secs": request.timeout.as_secs() }));
        let exit: WaitResponse = send_json(req, "wait")
            .await
            .map_err(SandboxError::ExecFailed)?;

        Ok(ExecResult {
            exit_code: exit.exit_code,
            stdout: exit.stdout,
            stderr: exit.stderr,
        })
    }
}
