pub mod config;
pub use config::{ConfigError, LlmConfig, ServiceConfig, StoreKind};

pub mod service;
pub use service::{QuantumService, ServiceError};
