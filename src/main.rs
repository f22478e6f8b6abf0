//! Sitestock service entry point

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitestock::email::EmailSender;
use sitestock::{routes, AppState, Config, ConsoleEmailSender, SmtpEmailSender, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitestock=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(port = config.port, db = %config.database_path, "Loaded configuration");

    // Open the store once at startup; every request shares this handle
    let store = SqliteStore::open(&config.database_path)
        .map_err(|e| anyhow::anyhow!("failed to open database: {e}"))?;

    let mailer: Box<dyn EmailSender> = match config.smtp {
        Some(smtp) => {
            let sender =
                SmtpEmailSender::new(smtp).map_err(|e| anyhow::anyhow!("SMTP setup failed: {e}"))?;
            Box::new(sender)
        }
        None => {
            tracing::warn!("No SMTP configuration; verification codes go to the console");
            Box::new(ConsoleEmailSender::new())
        }
    };

    // Create app state and router
    let state = Arc::new(AppState::new(store, mailer));
    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
