//! # Meeting Copilot Backend - Main Application Entry Point
//!
//! Actix-web server for the live-meeting copilot. HTTP routes cover
//! meeting record CRUD plus health/metrics; the realtime work happens on
//! the per-meeting WebSocket endpoint.
//!
//! ## Application Architecture:
//! - **config**: layered configuration (config.toml + APP_* env vars)
//! - **state**: shared application state (config, metrics, live engine)
//! - **live**: in-memory meeting state engine (dedup, extraction,
//!   summaries, question answering)
//! - **fanout**: per-meeting subscriber registry and broadcast
//! - **websocket**: the `/ws/meetings/{id}` observer endpoint
//! - **meetings / handlers**: meeting record store and its HTTP surface
//! - **middleware**: request telemetry (logging + metrics)
//! - **error**: application error type and HTTP error responses

mod config;
mod error;
mod fanout;
mod handlers;
mod health;
mod live;
mod meetings;
mod middleware;
mod state;
mod websocket;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag flipped by the signal handlers.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting meeting-copilot-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    info!(
        "Live engine: min update interval {}s, dedup threshold {}",
        config.meeting.min_update_interval_secs, config.meeting.dedup_similarity_threshold
    );

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::Telemetry)
            .service(
                web::scope("/api")
                    .route("/meetings", web::get().to(handlers::meetings::list_meetings))
                    .route("/meetings", web::post().to(handlers::meetings::create_meeting))
                    .route(
                        "/meetings/{meeting_id}",
                        web::get().to(handlers::meetings::get_meeting),
                    )
                    .route(
                        "/meetings/{meeting_id}/stop",
                        web::post().to(handlers::meetings::stop_meeting),
                    )
                    .route(
                        "/meetings/{meeting_id}",
                        web::delete().to(handlers::meetings::delete_meeting),
                    ),
            )
            .route("/ws/meetings/{meeting_id}", web::get().to(websocket::meeting_websocket))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Console logging via tracing, filterable with `RUST_LOG`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_copilot_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Flip the shutdown flag on SIGTERM or SIGINT so in-flight requests can
/// finish before the process exits.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Poll the shutdown flag without busy-waiting.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
