mod config;
mod http;
mod modal;
mod morph;
mod poll;
mod runloop;

pub use config::{ModalConfig, MorphConfig, RunloopConfig};
pub use http::{Auth, HttpClient};
pub use modal::{ModalFactory, ModalSandbox};
pub use morph::{MorphFactory, MorphSandbox};
pub use runloop::{RunloopFactory, RunloopSandbox};
