use crate::config::{Config, ConfigError};
use crate::db::{self, ConnectionPool, MigrationError};
use crate::reference::{CatalogError, ReferenceData, StaticCatalog};
use crate::{api, config};
use axum::ServiceExt;
use axum::extract::Request;
use diesel::r2d2::PoolError;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::SignalKind;
use tower::layer::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub connection_pool: ConnectionPool,
    pub config: Arc<Config>,
    pub reference: Arc<dyn ReferenceData>,
}

impl AppState {
    pub fn new(connection_pool: ConnectionPool, config: Config, reference: Arc<dyn ReferenceData>) -> Self {
        Self {
            connection_pool,
            config: Arc::new(config),
            reference,
        }
    }

    pub fn get_connection(&self) -> Result<db::Connection, PoolError> {
        db::get_connection(&self.connection_pool)
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum InitializationError {
    Catalog(#[from] CatalogError),
    Config(#[from] ConfigError),
    DatabaseUrl(#[from] std::env::VarError),
    FailedConnection(#[from] PoolError),
    Migration(MigrationError),
    StdIo(#[from] std::io::Error),
}

pub fn enable_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,tower_http=debug,axum=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Loads configuration and reference data, then brings the database schema up to date.
pub fn initialize() -> Result<AppState, InitializationError> {
    let config = config::create()?;
    let reference: Arc<dyn ReferenceData> = match &config.reference_data {
        Some(path) => Arc::new(StaticCatalog::load(path)?),
        None => {
            info!("No reference data configured, using built-in catalog");
            Arc::new(StaticCatalog::default())
        }
    };

    let connection_pool = db::create_connection_pool(config::database_url(None)?);
    let mut conn = db::get_connection(&connection_pool)?;
    db::run_migrations(&mut conn).map_err(InitializationError::Migration)?;
    drop(conn);

    Ok(AppState::new(connection_pool, config, reference))
}

pub async fn run(state: AppState) -> Result<(), InitializationError> {
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = NormalizePathLayer::trim_trailing_slash().layer(api::routes(state));

    let listener = TcpListener::bind(address).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Stopping server...");
}
