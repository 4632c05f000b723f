// Main entry point for d2-render-server.
// Parses the configuration, sets up logging, builds the Axum router and serves it until a
// shutdown signal arrives.

mod config;
mod decoding;
mod renderer;
mod shutdown_signal;
mod web;

use clap::Parser;
use config::{AppConfig, ServerConfig};
use shutdown_signal::shutdown_signal;

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let app_config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting d2-render-server...");

    let config = ServerConfig::from(app_config);

    tracing::info!(
        "Renderer: {} {:?}",
        config.renderer.program().display(),
        config.renderer.args()
    );
    match config.renderer.timeout() {
        Some(timeout) => tracing::info!("Render timeout: {:?}", timeout),
        None => tracing::info!("Render timeout disabled; a hung renderer holds its request open"),
    }
    if config.shared_secret.is_some() {
        tracing::info!("Requests must carry a matching 'Authentication' header");
    } else {
        tracing::warn!("No shared secret configured - all requests will be allowed");
    }

    let app = web::create_app(&config);
    tracing::info!("Axum router configured.");

    let listener = match web::create_listener(&config.host, config.port).await {
        Ok((addr, l)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            eprintln!("FATAL: Could not bind server. Error: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
        eprintln!("ERROR: Server shut down unexpectedly. Error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("d2-render-server has shut down.");
}
