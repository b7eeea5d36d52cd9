use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

pub struct HealthService;

impl HealthService {
    /// GET /api/health
    pub async fn health_check(app_start_time: web::Data<AppStartTime>) -> impl Responder {
        let now = chrono::Utc::now();
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0);

        HttpResponse::Ok().json(json!({
            "status": "ok",
            "uptime": uptime_seconds,
            "timestamp": now.to_rfc3339(),
        }))
    }
}
