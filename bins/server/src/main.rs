//! Storeledger API Server
//!
//! Main entry point for the Storeledger backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storeledger_api::{AppState, create_router};
use storeledger_core::{FinancialEngine, ReferenceCalendar};
use storeledger_db::{PgUnitOfWork, connect_with_pool};
use storeledger_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storeledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let timezone = config
        .ledger
        .timezone()
        .map_err(anyhow::Error::msg)?;
    let calendar = ReferenceCalendar::new(timezone);
    info!(timezone = %timezone, "Reference calendar configured");

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    };

    let state = AppState {
        engine: Arc::new(FinancialEngine::new(PgUnitOfWork::new(db), calendar)),
        jwt_service: Arc::new(JwtService::new(jwt_config)),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
