use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::delivery::{PushFn, RetryEngine};
use crate::ratelimit::{Admission, AdmissionGuard};
use crate::storage::UrlStore;
use crate::utils::validate_url;
use crate::ws::SessionRegistry;
use crate::ws::protocol::ResultPush;

pub const CLIENT_ID_HEADER: &str = "x-client-id";

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

pub struct ShortenService;

impl ShortenService {
    /// POST /api/url
    ///
    /// Responds 202 immediately; the shortened URL itself is delivered
    /// over the caller's WebSocket channel, addressed by the mandatory
    /// `x-client-id` header, and redelivered until acknowledged.
    pub async fn post_url(
        req: HttpRequest,
        body: web::Json<ShortenRequest>,
        store: web::Data<Arc<UrlStore>>,
        registry: web::Data<Arc<SessionRegistry>>,
        engine: web::Data<Arc<RetryEngine>>,
        guard: web::Data<Arc<AdmissionGuard>>,
        config: web::Data<Config>,
    ) -> impl Responder {
        let client_id = req
            .headers()
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        // Admission runs before validation, keyed by the client identity
        // when present, the peer address otherwise.
        let caller_key = client_id
            .clone()
            .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        if let Admission::Rejected { retry_after_secs } = guard.check(&caller_key) {
            warn!("Rate limit exceeded for client: {}", caller_key);
            return HttpResponse::TooManyRequests().json(json!({
                "error": "Too many requests, please try again later.",
                "retryAfter": retry_after_secs,
            }));
        }

        if let Err(e) = validate_url(&body.url) {
            return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
        }

        let Some(client_id) = client_id else {
            return HttpResponse::BadRequest().json(json!({
                "error": "Client ID is required in the x-client-id header",
            }));
        };

        let shortened = match store.shorten(&body.url, &config.base_url()) {
            Ok(shortened) => shortened,
            Err(e) => {
                error!("Error shortening URL: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Failed to shorten URL" }));
            }
        };
        info!(
            "URL shortened: {} -> {} for client {}",
            body.url, shortened.shortened_url, client_id
        );

        let payload = match serde_json::to_string(&ResultPush {
            shortened_url: shortened.shortened_url.clone(),
        }) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize result push: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Failed to shorten URL" }));
            }
        };

        // The mapping is durable at this point; push the first attempt
        // and start watching for the acknowledgment. A client with no
        // live channel gets no retry watch, matching the push contract.
        let delivered = registry.push(&client_id, payload.clone()).await;
        if delivered {
            info!("Sent shortened URL to client {}: {}", client_id, shortened.shortened_url);

            let registry = Arc::clone(registry.get_ref());
            let push: PushFn = Arc::new(move |_code: String| {
                let registry = Arc::clone(&registry);
                let client_id = client_id.clone();
                let payload = payload.clone();
                async move {
                    registry.push(&client_id, payload).await;
                }
                .boxed()
            });
            engine.watch(&shortened.code, push);
        }

        HttpResponse::Accepted().json(json!({ "message": "URL is being processed" }))
    }
}
