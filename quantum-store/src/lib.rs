use async_trait::async_trait;
use quantum_types::{AuditRow, QuantumRequest};
use thiserror::Error;

pub mod memory;
pub use memory::InMemoryAuditStore;

pub mod sqlite;
pub use sqlite::SqliteAuditStore;

#[derive(Debug, Error)]
#[error("audit store error: {message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Append-only audit table of accepted requests.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one row and return its store-assigned id.
    async fn record(&self, req: &QuantumRequest) -> Result<i64, StoreError>;

    /// Rows newest first.
    async fn history(&self, limit: usize, offset: usize) -> Result<Vec<AuditRow>, StoreError>;
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
