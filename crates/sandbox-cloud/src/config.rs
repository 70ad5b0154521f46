use std::time::Duration;

use sandbox::ResourceLimits;

pub const MORPH_DEFAULT_URL: &str = "https://cloud.morph.so/api";
pub const MODAL_DEFAULT_URL: &str = "https://api.modal.com";
pub const RUNLOOP_DEFAULT_URL: &str = "https://api.runloop.ai";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_SANDBOX_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct MorphConfig {
    pub base_url: String,
    pub api_key: String,
    /// Base image the benchmark snapshot is built from.
    pub image_id: String,
    /// Snapshot shape; instances inherit it.
    pub resources: ResourceLimits,
    pub poll_interval: Duration,
}

impl MorphConfig {
    pub fn new(api_key: String, resources: ResourceLimits) -> Self {
        Self {
            base_url: MORPH_DEFAULT_URL.into(),
            api_key,
            image_id: "morphvm-minimal".into(),
            resources,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModalConfig {
    pub base_url: String,
    pub token_id: String,
    pub token_secret: String,
    /// App that owns the benchmark sandboxes; created on first use.
    pub app_name: String,
    /// Lifetime Modal enforces on each sandbox before reaping it.
    pub sandbox_timeout: Duration,
}

impl ModalConfig {
    pub fn new(token_id: String, token_secret: String) -> Self {
        Self {
            base_url: MODAL_DEFAULT_URL.into(),
            token_id,
            token_secret,
            app_name: "sandbox-benchmark".into(),
            sandbox_timeout: DEFAULT_SANDBOX_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunloopConfig {
    pub base_url: String,
    pub api_key: String,
    pub poll_interval: Duration,
}

impl RunloopConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: RUNLOOP_DEFAULT_URL.into(),
            api_key,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
