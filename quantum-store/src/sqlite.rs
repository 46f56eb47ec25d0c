use std::path::Path;

use async_trait::async_trait;
use quantum_types::{AuditRow, QuantumRequest};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use crate::{now_rfc3339, AuditStore, StoreError};

/// Audit table backed by a single SQLite connection.
///
/// List columns are stored as JSON text.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::new(e.to_string()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::new(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS quantum_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                intent TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                cache_keys TEXT NOT NULL,
                requested_components TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| StoreError::new(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn record(&self, req: &QuantumRequest) -> Result<i64, StoreError> {
        let cache_keys =
            serde_json::to_string(&req.cache_keys).map_err(|e| StoreError::new(e.to_string()))?;
        let components = serde_json::to_string(&req.requested_components)
            .map_err(|e| StoreError::new(e.to_string()))?;

        let conn = self.conn.lock().await;
        conn.execute(
            "
            INSERT INTO quantum_requests
            (intent, user_id, cache_keys, requested_components, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![req.intent, req.user_id, cache_keys, components, now_rfc3339()],
        )
        .map_err(|e| StoreError::new(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    async fn history(&self, limit: usize, offset: usize) -> Result<Vec<AuditRow>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "
                SELECT id, intent, user_id, cache_keys, requested_components, created_at
                FROM quantum_requests
                ORDER BY id DESC
                LIMIT ?1 OFFSET ?2
                ",
            )
            .map_err(|e| StoreError::new(e.to_string()))?;

        let raw = stmt
            .query_map(params![to_sql_int(limit), to_sql_int(offset)], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| StoreError::new(e.to_string()))?;

        let mut rows = Vec::new();
        for r in raw {
            let (id, intent, user_id, cache_keys, components, created_at) =
                r.map_err(|e| StoreError::new(e.to_string()))?;
            rows.push(AuditRow {
                id,
                intent,
                user_id,
                cache_keys: serde_json::from_str(&cache_keys)
                    .map_err(|e| StoreError::new(format!("row {id}: {e}")))?,
                requested_components: serde_json::from_str(&components)
                    .map_err(|e| StoreError::new(format!("row {id}: {e}")))?,
                created_at,
            });
        }
        Ok(rows)
    }
}

// SQLite reads a negative OFFSET as 0, so out-of-range values must saturate.
fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
