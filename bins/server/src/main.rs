//! Corebank server.
//!
//! Serves the HTTP API and runs the task processor in one process. Ctrl-C
//! stops accepting requests, lets in-flight tasks finish within the
//! configured shutdown timeout, then exits.

use std::sync::Arc;

use anyhow::Context;
use corebank_api::{AppState, create_router};
use corebank_core::task::TASK_SEND_VERIFY_EMAIL;
use corebank_db::migration::{Migrator, MigratorTrait};
use corebank_db::{Store, connect};
use corebank_shared::{AppConfig, SmtpMailer};
use corebank_worker::{HandlerRegistry, ProcessorConfig, SendVerifyEmailHandler, TaskProcessor};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corebank=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    if config.database.run_migrations {
        Migrator::up(&db, None)
            .await
            .context("Failed to run migrations")?;
        info!("Migrations applied");
    }

    let shutdown = CancellationToken::new();
    let store = Store::new(db).with_tx_timeout(config.database.tx_timeout());

    let mailer = SmtpMailer::new(config.email.clone());
    info!(
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );

    let registry = HandlerRegistry::new().register(
        TASK_SEND_VERIFY_EMAIL,
        SendVerifyEmailHandler::new(
            store.clone(),
            Arc::new(mailer),
            config.email.verify_url_base.clone(),
        ),
    );
    let processor = TaskProcessor::new(
        store.clone(),
        registry,
        ProcessorConfig::from(&config.worker),
    );
    let processor = tokio::spawn(processor.run(shutdown.clone()));

    let app = create_router(AppState::new(store));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
        signal.cancel();
    });

    let serve_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
        .await;

    // Stop the processor even if the server failed
    shutdown.cancel();
    if let Err(e) = processor.await {
        error!(error = %e, "Task processor terminated abnormally");
    }

    served.context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}
