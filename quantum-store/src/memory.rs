use async_trait::async_trait;
use quantum_types::{AuditRow, QuantumRequest};
use tokio::sync::Mutex;

use crate::{now_rfc3339, AuditStore, StoreError};

/// Audit table held in process memory. Not durable.
#[derive(Default)]
pub struct InMemoryAuditStore {
    rows: Mutex<Vec<AuditRow>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn record(&self, req: &QuantumRequest) -> Result<i64, StoreError> {
        let mut rows = self.rows.lock().await;
        let id = rows.len() as i64 + 1;
        rows.push(AuditRow {
            id,
            intent: req.intent.clone(),
            user_id: req.user_id,
            cache_keys: req.cache_keys.clone(),
            requested_components: req.requested_components.clone(),
            created_at: now_rfc3339(),
        });
        Ok(id)
    }

    async fn history(&self, limit: usize, offset: usize) -> Result<Vec<AuditRow>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().rev().skip(offset).take(limit).cloned().collect())
    }
}
