//! Owner-scoped routes: listing and asynchronous deletion

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::constants::MAX_BATCH_SIZE;
use crate::api::middleware::SessionOwner;
use crate::errors::ShortenerError;

use super::helpers::{AppState, error_response, unauthorized};

#[derive(Debug, Serialize, Deserialize)]
pub struct UserUrlItem {
    pub short_url: String,
    pub original_url: String,
}

pub struct UserUrlsService;

impl UserUrlsService {
    /// `GET /api/user/urls`
    pub async fn list(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
        let Some(owner) = SessionOwner::from_request(&req) else {
            return unauthorized();
        };

        match state.service.owner_urls(owner).await {
            Ok(records) if records.is_empty() => HttpResponse::NoContent().finish(),
            Ok(records) => {
                debug!("Owner {} has {} URLs", owner, records.len());
                let body: Vec<UserUrlItem> = records
                    .into_iter()
                    .map(|r| UserUrlItem {
                        short_url: state.short_url(&r.short_key),
                        original_url: r.original_url,
                    })
                    .collect();
                HttpResponse::Ok().json(body)
            }
            Err(e) => error_response(&e),
        }
    }

    /// `DELETE /api/user/urls` with a JSON list of keys
    ///
    /// 202 只表示已受理，删除在后台完成。
    pub async fn delete(
        req: HttpRequest,
        payload: web::Json<Vec<String>>,
        state: web::Data<AppState>,
    ) -> impl Responder {
        let Some(owner) = SessionOwner::from_request(&req) else {
            return unauthorized();
        };

        let keys = payload.into_inner();
        if keys.len() > MAX_BATCH_SIZE {
            return error_response(&ShortenerError::validation(format!(
                "batch size {} exceeds limit {}",
                keys.len(),
                MAX_BATCH_SIZE
            )));
        }

        let count = keys.len();
        match state.service.delete_urls(owner, keys) {
            Ok(_handle) => {
                info!("Accepted {} keys for deletion from owner {}", count, owner);
                HttpResponse::Accepted().finish()
            }
            Err(e) => error_response(&e),
        }
    }
}

pub fn user_urls_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/user/urls")
            .route(web::get().to(UserUrlsService::list))
            .route(web::delete().to(UserUrlsService::delete)),
    );
}
