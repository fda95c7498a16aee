/// Hot-reload definition registry using ArcSwap
///
/// Reads are lock-free loads of an immutable snapshot map. Writes are
/// serialized behind an async mutex so the duplicate-name check and the insert
/// happen as one compare-and-set, then publish a fresh snapshot with an atomic
/// pointer swap. Running instances keep whatever definition they already hold.

use crate::error::{EngineError, Result};
use crate::workflow::{
    storage::DefinitionStorage,
    types::{DefinitionRequest, WorkflowDefinition},
};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

/// Definition lookups and management
///
/// The engine only calls the lookup methods; the rest back the management API.
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    /// Look up a definition by id
    async fn get_by_id(&self, id: &str) -> Result<Option<WorkflowDefinition>>;

    /// Look up a definition by its unique name
    async fn get_by_name(&self, name: &str) -> Result<Option<WorkflowDefinition>>;

    /// All definitions, ordered by name
    async fn list(&self) -> Result<Vec<WorkflowDefinition>>;

    /// Validate and store a new definition under a fresh id
    async fn create(&self, request: DefinitionRequest) -> Result<WorkflowDefinition>;

    /// Replace the whole record stored under `id`
    async fn replace(&self, id: &str, request: DefinitionRequest) -> Result<WorkflowDefinition>;

    /// Remove a definition
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory definition registry with optional SQLite write-through
#[derive(Debug)]
pub struct DefinitionRegistry {
    /// Key: definition id
    definitions: ArcSwap<HashMap<String, WorkflowDefinition>>,

    /// Persistent backing; None keeps definitions in memory only
    storage: Option<DefinitionStorage>,

    /// Serializes writers so name checks and inserts cannot interleave
    write_lock: Mutex<()>,
}

impl DefinitionRegistry {
    /// Registry without persistence
    pub fn in_memory() -> Self {
        Self {
            definitions: ArcSwap::new(Arc::new(HashMap::new())),
            storage: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Registry that writes every change through to SQLite
    pub fn with_storage(storage: DefinitionStorage) -> Self {
        Self {
            storage: Some(storage),
            ..Self::in_memory()
        }
    }

    /// Populate the registry from storage
    ///
    /// Called during application startup. No-op for in-memory registries.
    pub async fn init_from_storage(&self) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        let stored = storage.load_all_definitions().await?;
        self.definitions.store(Arc::new(stored));

        tracing::info!("Initialized definition registry with {} definitions",
            self.definitions.load().len());

        Ok(())
    }

    /// Store a definition under its own id unless that id is already present
    ///
    /// Used for seeding; a stored definition, including one edited since it was
    /// first seeded, is left untouched and None is returned. Fails with
    /// Conflict if another id already uses the name.
    pub async fn seed(&self, definition: WorkflowDefinition) -> Result<Option<WorkflowDefinition>> {
        let _guard = self.write_lock.lock().await;
        if self.definitions.load().contains_key(&definition.id) {
            return Ok(None);
        }
        self.ensure_name_free(&definition.name, Some(&definition.id))?;
        self.commit(definition).await.map(Some)
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_name_free(&self, name: &str, owner_id: Option<&str>) -> Result<()> {
        let taken = self
            .definitions
            .load()
            .values()
            .any(|d| d.name == name && Some(d.id.as_str()) != owner_id);

        if taken {
            return Err(EngineError::Conflict(format!(
                "Workflow definition with name \"{}\" already exists.",
                name
            )));
        }
        Ok(())
    }

    /// Persist, then swap in a snapshot containing the definition
    ///
    /// Caller must hold `write_lock`.
    async fn commit(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition> {
        if let Some(storage) = &self.storage {
            storage.save_definition(&definition).await?;
        }

        let mut next = (**self.definitions.load()).clone();
        next.insert(definition.id.clone(), definition.clone());
        self.definitions.store(Arc::new(next));

        Ok(definition)
    }
}

fn not_found(id: &str) -> EngineError {
    EngineError::NotFound(format!("Workflow definition with ID \"{}\" not found.", id))
}

#[async_trait]
impl DefinitionRepository for DefinitionRegistry {
    async fn get_by_id(&self, id: &str) -> Result<Option<WorkflowDefinition>> {
        Ok(self.definitions.load().get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<WorkflowDefinition>> {
        Ok(self
            .definitions
            .load()
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<WorkflowDefinition>> {
        let mut all: Vec<WorkflowDefinition> = self.definitions.load().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn create(&self, request: DefinitionRequest) -> Result<WorkflowDefinition> {
        request.validate().map_err(EngineError::Validation)?;

        let _guard = self.write_lock.lock().await;
        self.ensure_name_free(&request.name, None)?;

        let definition = request.into_definition(uuid::Uuid::new_v4().to_string());
        let definition = self.commit(definition).await?;

        tracing::info!("📋 Created workflow definition: {} - {}", definition.id, definition.name);
        Ok(definition)
    }

    async fn replace(&self, id: &str, request: DefinitionRequest) -> Result<WorkflowDefinition> {
        request.validate().map_err(EngineError::Validation)?;

        let _guard = self.write_lock.lock().await;
        if !self.definitions.load().contains_key(id) {
            return Err(not_found(id));
        }
        self.ensure_name_free(&request.name, Some(id))?;

        let definition = self.commit(request.into_definition(id.to_string())).await?;

        tracing::info!("🔥 Replaced workflow definition: {} - {}", definition.id, definition.name);
        Ok(definition)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.definitions.load().contains_key(id) {
            return Err(not_found(id));
        }

        if let Some(storage) = &self.storage {
            storage.delete_definition(id).await?;
        }

        let mut next = (**self.definitions.load()).clone();
        next.remove(id);
        self.definitions.store(Arc::new(next));

        tracing::info!("Removed workflow definition: {}", id);
        Ok(())
    }
}
