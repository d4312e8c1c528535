use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monorail_core::domain::identity::ConnectionHandle;
use monorail_orchestrator::api;
use monorail_orchestrator::collaborator::{
    Collaborators, MemoryArtifactStore, MemoryBuildRunner, MemoryDeployService,
    MemoryIdentityService, MemorySourceConnection, snapshot_from_dir,
};
use monorail_orchestrator::config::Config;
use monorail_orchestrator::service::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monorail_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Monorail Orchestrator...");

    let config = load_config()?;
    info!(
        "Loaded configuration: artifact_location={}, connection={}",
        config.artifact_location, config.connection_ref
    );

    // Local mode: every collaborator is backed in memory
    let connection = ConnectionHandle::new(config.connection_ref.clone());
    let source = Arc::new(MemorySourceConnection::new(connection));
    let artifacts = Arc::new(MemoryArtifactStore::new());
    artifacts.create_location(&config.artifact_location).await;

    let collaborators = Collaborators {
        source: source.clone(),
        build: Arc::new(MemoryBuildRunner::new()),
        artifacts,
        deploy: Arc::new(MemoryDeployService::new()),
        identity: Arc::new(MemoryIdentityService::new()),
    };

    let orchestrator = Arc::new(Orchestrator::new(collaborators, &config));

    let snapshot = match &config.source_root {
        Some(root) => {
            let files = snapshot_from_dir(root)
                .await
                .with_context(|| format!("Failed to read source root {}", root.display()))?;
            info!("Loaded {} files from {}", files.len(), root.display());
            Some(files)
        }
        None => None,
    };

    let records = config.load_pipelines()?;
    info!("Defining {} pipelines", records.len());

    for record in records {
        if let Some(files) = &snapshot {
            source
                .push(&record.repository, &record.branch, files.clone())
                .await;
        }

        let project_name = record.project_name.clone();
        let pipeline = orchestrator
            .define_pipeline(record)
            .await
            .with_context(|| format!("Failed to define pipeline for {}", project_name))?;
        info!("  - {}", pipeline.name());
    }

    // Build router with all API endpoints
    let app = api::create_router(orchestrator);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(_) => {
            info!("Failed to load config from environment, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
