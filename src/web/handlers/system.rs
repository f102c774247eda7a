use actix_web::{web, HttpResponse, Responder};

use crate::web::models::{HealthResponse, MessageResponse, SystemStatusResponse};
use crate::web::server::AppState;

/// Get the overall system status
pub async fn get_system_status(data: web::Data<AppState>) -> impl Responder {
    let response = SystemStatusResponse {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: data.started_at.elapsed().as_secs(),
        connected_clients: data.hub.connected_count(),
    };

    HttpResponse::Ok().json(response)
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse { status: "ok".to_string() })
}

pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(MessageResponse::new("pong"))
}
