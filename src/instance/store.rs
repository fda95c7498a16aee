/// Durable key-value persistence for instance documents
///
/// Every instance lives under `instance:<instanceId>` as its full JSON
/// document, optionally with an expiry. The engine reads and writes through
/// the `InstanceStore` trait and never deletes records; expired documents are
/// hidden on read and purged by the adapters on the next write.

use crate::error::Result;
use crate::instance::types::WorkflowInstance;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use std::{collections::HashMap, time::Duration};
use tokio::sync::RwLock;

/// Key prefix for instance documents
pub const INSTANCE_KEY_PREFIX: &str = "instance:";

/// Storage key of an instance
pub fn instance_key(instance_id: &str) -> String {
    format!("{}{}", INSTANCE_KEY_PREFIX, instance_id)
}

/// Keyed storage of instance documents
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Load the persisted snapshot, or None if absent or expired
    async fn get(&self, instance_id: &str) -> Result<Option<WorkflowInstance>>;

    /// Write the full document, replacing any previous version
    async fn put(&self, instance: &WorkflowInstance) -> Result<()>;
}

fn expiry_from(ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok())
        .map(|ttl| Utc::now() + ttl)
}

/// Process-local instance store
///
/// Documents are kept serialized, like a remote key-value store would hold
/// them, so callers never share state with what is stored.
#[derive(Debug, Default)]
pub struct MemoryInstanceStore {
    entries: RwLock<HashMap<String, StoredDocument>>,
    ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredDocument {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl MemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an expiry to every subsequent write
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Number of stored documents, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl InstanceStore for MemoryInstanceStore {
    async fn get(&self, instance_id: &str) -> Result<Option<WorkflowInstance>> {
        let entries = self.entries.read().await;
        let Some(doc) = entries.get(&instance_key(instance_id)) else {
            return Ok(None);
        };

        if doc.is_expired(Utc::now()) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&doc.value)?))
    }

    async fn put(&self, instance: &WorkflowInstance) -> Result<()> {
        let doc = StoredDocument {
            value: serde_json::to_string(instance)?,
            expires_at: expiry_from(self.ttl),
        };
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, stored| !stored.is_expired(now));
        entries.insert(instance_key(&instance.instance_id), doc);
        Ok(())
    }
}

/// SQLite-backed key-value instance store
#[derive(Debug, Clone)]
pub struct SqliteInstanceStore {
    pool: SqlitePool,
    ttl: Option<Duration>,
}

impl SqliteInstanceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, ttl: None }
    }

    /// Apply an expiry to every subsequent write
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Create the key-value table
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value JSON NOT NULL,
                expires_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl InstanceStore for SqliteInstanceStore {
    async fn get(&self, instance_id: &str) -> Result<Option<WorkflowInstance>> {
        let row = sqlx::query(
            "SELECT value FROM kv_store WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(instance_key(instance_id))
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let value: String = row.get("value");
                Ok(Some(serde_json::from_str(&value)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, instance: &WorkflowInstance) -> Result<()> {
        let value = serde_json::to_string(instance)?;
        let expires_at = expiry_from(self.ttl).map(|at| at.timestamp_millis());

        let purged = sqlx::query("DELETE FROM kv_store WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            tracing::debug!("🧹 Purged {} expired instance documents", purged);
        }

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(instance_key(&instance.instance_id))
        .bind(&value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
