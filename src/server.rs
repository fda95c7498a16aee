/// Server setup and initialization
///
/// Wires together all components: stores, registries, execution engine,
/// event logging and HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::{create_definition_routes, create_instance_routes, AppState},
    config::{Config, StoreBackend},
    instance::store::{InstanceStore, MemoryInstanceStore, SqliteInstanceStore},
    runtime::{
        engine::ExecutionEngine,
        events::{log_events, BroadcastPublisher},
        functions::FunctionRegistry,
        simulated::register_simulated_functions,
    },
    workflow::{
        registry::{DefinitionRegistry, DefinitionRepository},
        storage::DefinitionStorage,
        types::sample_signup_workflow,
    },
};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Build the shared application state for the configured backend
pub async fn create_state(config: &Config) -> Result<AppState> {
    let (registry, instances): (Arc<DefinitionRegistry>, Arc<dyn InstanceStore>) =
        match config.database.backend {
            StoreBackend::Memory => {
                tracing::info!("🧠 Using in-memory definition registry and instance store");
                let instances: Arc<dyn InstanceStore> =
                    Arc::new(MemoryInstanceStore::new().with_ttl(config.engine.instance_ttl()));
                (Arc::new(DefinitionRegistry::in_memory()), instances)
            }
            StoreBackend::Sqlite => {
                tracing::info!("📁 Ensuring data directory exists: {}", config.database.data_dir);
                std::fs::create_dir_all(&config.database.data_dir)
                    .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

                let db_path = config.database.sqlite_path();
                tracing::info!("🗄️ Opening SQLite database: {}", db_path.display());
                let options = SqliteConnectOptions::new()
                    .filename(&db_path)
                    .create_if_missing(true);
                let pool = SqlitePool::connect_with(options).await?;

                let storage = DefinitionStorage::new(pool.clone());
                storage
                    .init_schema()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to initialize definition schema: {}", e))?;
                let registry = Arc::new(DefinitionRegistry::with_storage(storage));

                tracing::info!("📥 Loading existing definitions from storage");
                registry
                    .init_from_storage()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to load definitions from storage: {}", e))?;

                let instances = SqliteInstanceStore::new(pool).with_ttl(config.engine.instance_ttl());
                instances
                    .init_schema()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to initialize instance schema: {}", e))?;

                let instances: Arc<dyn InstanceStore> = Arc::new(instances);
                (registry, instances)
            }
        };

    let mut functions = FunctionRegistry::new();
    register_simulated_functions(&mut functions, config.engine.simulated_latency());

    if config.engine.seed_sample_workflow {
        match registry.seed(sample_signup_workflow()).await {
            Ok(Some(sample)) => tracing::info!("🌱 Seeded sample workflow: {} ({})", sample.name, sample.id),
            Ok(None) => tracing::info!("🌱 Sample workflow already stored, keeping it"),
            Err(e) => tracing::warn!("⚠️ Sample workflow not seeded: {}", e),
        }
    }

    for definition in registry.list().await? {
        functions.warn_unresolved(&definition);
    }

    tracing::info!("📣 Starting event logger");
    let events = Arc::new(BroadcastPublisher::new(config.engine.event_channel_capacity));
    tokio::spawn(log_events(events.subscribe()));

    tracing::info!("🚀 Initializing execution engine");
    let engine = ExecutionEngine::new(registry, instances, Arc::new(functions), events);

    Ok(AppState {
        engine: Arc::new(engine),
    })
}

/// Assemble the HTTP router over an existing state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Definition management API routes
        .merge(create_definition_routes())
        // Trigger and instance query routes
        .merge(create_instance_routes())
        .with_state(state)
}

/// Create the main Axum application with all routes
pub async fn create_app(config: Config) -> Result<Router> {
    let state = create_state(&config).await?;

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = create_router(state);

    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and starts the Axum server on the configured address and port.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting stepway server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
