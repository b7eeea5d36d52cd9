//! HTTP service layer
//!
//! Handlers for the shorten/resolve/health endpoints plus the route
//! table shared between `main` and the integration tests. The HTTP
//! layer validates and admits requests, then hands off to the store,
//! the session registry and the retry engine.

use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

mod health;
mod resolve;
mod shorten;

pub use health::{AppStartTime, HealthService};
pub use resolve::ResolveService;
pub use shorten::{ShortenRequest, ShortenService};

/// Full route table. App data (store, registry, engine, guard, config)
/// is attached by the caller.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(crate::ws::ws_entry))
        .service(
            web::scope("/api")
                .route("/url", web::post().to(ShortenService::post_url))
                .route("/health", web::get().to(HealthService::health_check))
                .route("", web::get().to(api_root))
                .route("/{code}", web::get().to(ResolveService::get_url)),
        )
        .route("/", web::get().to(root))
        .default_service(web::route().to(not_found));
}

async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "Hello World!" }))
}

async fn api_root() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({ "error": "Not Found" }))
}
