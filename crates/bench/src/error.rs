use crate::provider::ProviderKind;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("missing credentials for {provider}: set {vars}")]
    Credentials { provider: ProviderKind, vars: String },

    #[error("no providers to benchmark: {0}")]
    NoProviders(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] sandbox::SandboxError),

    #[error("record error: {0}")]
    Record(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;
