use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, error};

use crate::api::constants::TEXT_PLAIN;

use super::helpers::{AppState, error_response};

pub struct SystemService;

impl SystemService {
    /// `GET /ping`
    pub async fn ping(state: web::Data<AppState>) -> impl Responder {
        match state.service.ping().await {
            Ok(()) => HttpResponse::Ok()
                .insert_header((CONTENT_TYPE, TEXT_PLAIN))
                .body("OK"),
            Err(e) => {
                error!("Storage ping failed ({}): {}", state.service.backend_name(), e);
                HttpResponse::InternalServerError()
                    .insert_header((CONTENT_TYPE, TEXT_PLAIN))
                    .body("Internal Server Error")
            }
        }
    }

    /// `GET /api/internal/stats`
    pub async fn stats(state: web::Data<AppState>) -> impl Responder {
        match state.service.stats().await {
            Ok(stats) => {
                debug!("Stats: {} urls, {} users", stats.urls, stats.users);
                HttpResponse::Ok().json(stats)
            }
            Err(e) => error_response(&e),
        }
    }
}

pub fn system_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ping", web::get().to(SystemService::ping))
        .route("/api/internal/stats", web::get().to(SystemService::stats));
}
