//! # Baby Control API Server
//!
//! Loads configuration from the environment, connects to PostgreSQL, applies
//! migrations and serves the API until interrupted.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/babycontrol \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p babycontrol-api
//! ```

use babycontrol_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use babycontrol_shared::{
    auth::password,
    db::{migrations::run_migrations, pool},
    models::app_config::AppConfig,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "babycontrol_api=debug,babycontrol_shared=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.deployment.mode,
        "Baby Control API server starting"
    );

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&db).await?;

    // Seeds the system administrator on first start; later changes go through the API
    match config.admin_password.as_deref() {
        Some(admin_password) => {
            let hash = password::hash_password(admin_password)?;
            AppConfig::ensure(&db, &hash).await?;
        }
        None => {
            if AppConfig::get(&db).await?.is_none() {
                tracing::warn!("ADMIN_PASSWORD is not set; system administrator login is disabled");
            }
        }
    }

    let addr = config.bind_address();
    let state = AppState::new(db.clone(), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}
