use std::time::Duration;

/// Resource profile requested for every sandbox, kept identical across
/// providers so timings are comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub vcpus: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            vcpus: 1,
            memory_mb: 2048,
            disk_gb: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub id: uuid::Uuid,
    pub resources: ResourceLimits,
    /// How long `create()` may wait for the provider to report the sandbox ready.
    pub ready_timeout: Duration,
}
