/// Stepway: linear step-chain workflow engine
///
/// Main entry point for the stepway server. Loads configuration from the
/// environment and starts the HTTP server.

use stepway::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Definition management API at /workflows/definitions
/// - Workflow triggers at /workflows/{idOrName}/trigger
/// - Instance status at /workflows/instances/{instanceId}
/// - Health check at /healthz
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (STEPWAY_* environment variables, defaults otherwise)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
