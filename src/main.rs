use axum::Router;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizdash::{
    api,
    config::AppConfig,
    session::Session,
    storage::{FileStore, KvStore, MemoryStore},
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizdash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizdash...");

    let config = AppConfig::from_env();

    // Without a usable data directory the tabs of this process still sync with each other
    let store: Arc<dyn KvStore> = match FileStore::open(&config.data_dir).await {
        Ok(store) => {
            tracing::info!("Storing game state in {}", config.data_dir.display());
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Data directory {} unusable ({}), state will not survive a restart",
                config.data_dir.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    };

    let (bus, _) = broadcast::channel(64);
    let mut sessions = Vec::new();
    let mut app = Router::new();

    for role in &config.roles {
        let session = Session::open(*role, store.clone(), bus.clone(), config.session_config()).await;
        session.start();
        app = app.nest(&format!("/{}", role), api::router(session.clone()));
        sessions.push(session);
    }

    let app = app
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", config.bind);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    for session in &sessions {
        session.shutdown();
    }
    tracing::info!("Shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
