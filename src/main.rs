use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use boothdesk::config::AppConfig;
use boothdesk::db;
use boothdesk::handlers;
use boothdesk::models::PriceList;
use boothdesk::services::auth::firebase::FirebaseAuthProvider;
use boothdesk::services::auth::local::LocalAuthProvider;
use boothdesk::services::auth::AuthProvider;
use boothdesk::services::lifecycle::BookingLifecycle;
use boothdesk::services::session::SessionKeys;
use boothdesk::services::store::firebase::FirebaseRecordStore;
use boothdesk::services::store::sqlite::SqliteRecordStore;
use boothdesk::services::store::RecordStore;
use boothdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let (store, auth): (Arc<dyn RecordStore>, Box<dyn AuthProvider>) =
        match config.store_backend.as_str() {
            "firebase" => {
                anyhow::ensure!(
                    !config.firebase_database_url.is_empty(),
                    "FIREBASE_DATABASE_URL must be set when STORE_BACKEND=firebase"
                );
                anyhow::ensure!(
                    !config.firebase_api_key.is_empty(),
                    "FIREBASE_API_KEY must be set when STORE_BACKEND=firebase"
                );
                tracing::info!(
                    "using Firebase record store (url: {}, poll: {}s)",
                    config.firebase_database_url,
                    config.poll_interval_secs
                );
                let store: Arc<dyn RecordStore> = Arc::new(FirebaseRecordStore::new(
                    config.firebase_database_url.clone(),
                    config.firebase_database_secret.clone(),
                    Duration::from_secs(config.poll_interval_secs.max(1)),
                ));
                let auth: Box<dyn AuthProvider> =
                    Box::new(FirebaseAuthProvider::new(config.firebase_api_key.clone()));
                (store, auth)
            }
            _ => {
                tracing::info!("using SQLite record store (path: {})", config.database_url);
                let conn = db::init_db(&config.database_url)
                    .with_context(|| format!("failed to open {}", config.database_url))?;
                let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(conn));
                let auth: Box<dyn AuthProvider> = Box::new(LocalAuthProvider::single(
                    &config.admin_email,
                    &config.admin_password,
                ));
                (store, auth)
            }
        };

    let session_secret = if config.session_secret.is_empty() {
        tracing::warn!("SESSION_SECRET not set, sessions will not survive a restart");
        uuid::Uuid::new_v4().to_string()
    } else {
        config.session_secret.clone()
    };
    let sessions = SessionKeys::new(
        &session_secret,
        chrono::Duration::hours(config.session_ttl_hours.max(1)),
    )?;

    let prices = if config.package_prices.trim().is_empty() {
        PriceList::default()
    } else {
        PriceList::parse(&config.package_prices).context("invalid PACKAGE_PRICES")?
    };

    let lifecycle = BookingLifecycle::start(store)
        .await
        .context("failed to subscribe to the record store")?;

    let state = Arc::new(AppState {
        config: config.clone(),
        lifecycle,
        auth,
        sessions,
        prices,
    });

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
