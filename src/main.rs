use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use tracing::info;

use shortpush::config::Config;
use shortpush::delivery::{MAX_RETRIES, RETRY_INTERVAL, RetryEngine};
use shortpush::ratelimit::{AdmissionGuard, MAX_REQUESTS, RATE_WINDOW};
use shortpush::services::{self, AppStartTime};
use shortpush::storage::UrlStore;
use shortpush::system;
use shortpush::ws::SessionRegistry;

const URL_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const RATE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    let _log_guard = system::init_logging(&config);

    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    // Explicit instances, constructed once and shared by handle; each
    // collaborator gets them through app data.
    let store = Arc::new(UrlStore::open(&config.snapshot_file));
    let engine = Arc::new(RetryEngine::new(store.clone(), RETRY_INTERVAL, MAX_RETRIES));
    let registry = Arc::new(SessionRegistry::new());
    let guard = Arc::new(AdmissionGuard::new(RATE_WINDOW, MAX_REQUESTS));

    let sweep_store = store.clone();
    let url_sweep = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(URL_SWEEP_INTERVAL);
        ticker.tick().await; // first tick fires immediately, skip it
        loop {
            ticker.tick().await;
            info!("Running scheduled cleanup of expired URLs");
            sweep_store.sweep_expired();
        }
    });

    let sweep_guard = guard.clone();
    let rate_sweep = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_guard.sweep();
        }
    });

    let bind_address = config.bind_address();
    info!("Starting server at http://{}", bind_address);
    info!("WebSocket endpoint available at ws://{}/ws", bind_address);

    let app_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(engine.clone()))
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(guard.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .configure(services::routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    // Server stopped accepting connections; snapshot writes are
    // synchronous, so nothing is in flight past this point.
    url_sweep.abort();
    rate_sweep.abort();
    info!("Server stopped");

    Ok(())
}
