use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use tracing::info;

use crate::storage::UrlStore;

pub struct ResolveService;

impl ResolveService {
    /// GET /api/{code}
    ///
    /// Returns the original URL for a live short code. Expired codes are
    /// removed by the store on first lookup and read as not found.
    pub async fn get_url(
        path: web::Path<String>,
        store: web::Data<Arc<UrlStore>>,
    ) -> impl Responder {
        let code = path.into_inner();

        match store.lookup(&code) {
            Some(url) => {
                info!("Retrieving original URL for code: {}", code);
                HttpResponse::Ok().json(json!({ "url": url }))
            }
            None => HttpResponse::NotFound().json(json!({ "error": "URL not found" })),
        }
    }
}
