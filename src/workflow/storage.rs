/// SQLite persistence layer for workflow definitions
///
/// Definitions are stored as a JSON document next to indexed id/name columns.

use crate::error::Result;
use crate::workflow::types::WorkflowDefinition;
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashMap;

/// SQLite-based definition storage
#[derive(Debug, Clone)]
pub struct DefinitionStorage {
    pool: SqlitePool,
}

impl DefinitionStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the definitions table and name index
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflow_definitions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                definition JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_workflow_definitions_name
            ON workflow_definitions(name)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace a definition
    ///
    /// UPSERT on id; the whole JSON document is replaced.
    pub async fn save_definition(&self, definition: &WorkflowDefinition) -> Result<()> {
        let definition_json = serde_json::to_string(definition)?;

        sqlx::query(
            r#"
            INSERT INTO workflow_definitions (id, name, definition, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&definition.id)
        .bind(&definition.name)
        .bind(&definition_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load every definition, keyed by id, for registry initialization
    pub async fn load_all_definitions(&self) -> Result<HashMap<String, WorkflowDefinition>> {
        let rows = sqlx::query("SELECT id, definition FROM workflow_definitions")
            .fetch_all(&self.pool)
            .await?;

        let mut definitions = HashMap::new();
        for row in rows {
            let id: String = row.get("id");
            let definition_json: String = row.get("definition");
            let definition: WorkflowDefinition = serde_json::from_str(&definition_json)?;
            definitions.insert(id, definition);
        }

        Ok(definitions)
    }

    /// Delete a definition by id; returns whether a row was removed
    pub async fn delete_definition(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflow_definitions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::workflow::types::sample_signup_workflow;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Single-connection in-memory pool; every connection would otherwise get its own database
    pub(crate) async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_get_delete() {
        let storage = DefinitionStorage::new(memory_pool().await);
        storage.init_schema().await.unwrap();

        assert!(storage.load_all_definitions().await.unwrap().is_empty());

        let sample = sample_signup_workflow();
        storage.save_definition(&sample).await.unwrap();

        let loaded = storage.load_all_definitions().await.unwrap();
        assert_eq!(loaded["sample-user-signup"], sample);

        assert!(storage.delete_definition("sample-user-signup").await.unwrap());
        assert!(!storage.delete_definition("sample-user-signup").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_replaces_whole_document() {
        let storage = DefinitionStorage::new(memory_pool().await);
        storage.init_schema().await.unwrap();

        let mut sample = sample_signup_workflow();
        storage.save_definition(&sample).await.unwrap();

        sample.steps.remove("logAnalytics");
        sample.description = None;
        storage.save_definition(&sample).await.unwrap();

        let all = storage.load_all_definitions().await.unwrap();
        assert_eq!(all.len(), 1);
        let loaded = &all["sample-user-signup"];
        assert_eq!(loaded.steps.len(), 3);
        assert!(loaded.description.is_none());
    }
}
