//! Main Entrypoint for the Voicegate Relay Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Loading the knowledge base and building the combined instructions once.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use voicegate_api::{config::Config, router::create_router, state::AppState};
use voicegate_core::knowledge::{self, DEFAULT_BASE_INSTRUCTIONS};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Load Knowledge and Build Instructions ---
    let entries = match knowledge::load_knowledge(&config.knowledge_path) {
        Ok(entries) => {
            info!(
                count = entries.len(),
                path = %config.knowledge_path.display(),
                "Knowledge base loaded"
            );
            entries
        }
        Err(e) => {
            warn!(error = %e, "No knowledge base available. Using base instructions only.");
            Vec::new()
        }
    };
    let fragment = knowledge::format_knowledge(&entries, config.knowledge_max_chars);
    let instructions = knowledge::build_instructions(DEFAULT_BASE_INSTRUCTIONS, &fragment);
    info!(
        instructions_length = instructions.chars().count(),
        "Session instructions assembled"
    );

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        instructions: Arc::new(instructions),
        knowledge_entries: entries.len(),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        bind_address = %config.bind_address,
        deployment = %config.deployment,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
