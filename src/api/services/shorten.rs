//! Write routes: plain-text, JSON and batch shortening

use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::api::constants::{MAX_BATCH_SIZE, TEXT_PLAIN};
use crate::errors::ShortenerError;
use crate::utils::validate_url;

use super::helpers::{AppState, error_response, resolve_write_owner};

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}

pub struct ShortenService;

impl ShortenService {
    /// `POST /` with the URL as the plain-text body
    pub async fn shorten_text(
        req: HttpRequest,
        body: String,
        state: web::Data<AppState>,
    ) -> impl Responder {
        let url = match validate_url(&body) {
            Ok(url) => url.to_string(),
            Err(e) => return error_response(&e.into()),
        };

        let writer = resolve_write_owner(&req, &state).await;
        let resp = match state.service.shorten(&url, writer.owner).await {
            Ok(key) => Self::text(StatusCode::CREATED, state.short_url(&key)),
            Err(ShortenerError::Conflict { key }) => {
                trace!("URL already stored as {}", key);
                Self::text(StatusCode::CONFLICT, state.short_url(&key))
            }
            Err(e) => error_response(&e),
        };
        writer.apply(resp)
    }

    /// `POST /api/shorten` with `{"url": ...}`
    pub async fn shorten_json(
        req: HttpRequest,
        payload: web::Json<ShortenRequest>,
        state: web::Data<AppState>,
    ) -> impl Responder {
        let url = match validate_url(&payload.url) {
            Ok(url) => url.to_string(),
            Err(e) => return error_response(&e.into()),
        };

        let writer = resolve_write_owner(&req, &state).await;
        let resp = match state.service.shorten(&url, writer.owner).await {
            Ok(key) => HttpResponse::Created().json(ShortenResponse {
                result: state.short_url(&key),
            }),
            Err(ShortenerError::Conflict { key }) => HttpResponse::Conflict().json(ShortenResponse {
                result: state.short_url(&key),
            }),
            Err(e) => error_response(&e),
        };
        writer.apply(resp)
    }

    /// `POST /api/shorten/batch`
    pub async fn shorten_batch(
        req: HttpRequest,
        payload: web::Json<Vec<BatchRequestItem>>,
        state: web::Data<AppState>,
    ) -> impl Responder {
        let items = payload.into_inner();
        if items.is_empty() {
            return error_response(&ShortenerError::validation("batch cannot be empty"));
        }
        if items.len() > MAX_BATCH_SIZE {
            return error_response(&ShortenerError::validation(format!(
                "batch size {} exceeds limit {}",
                items.len(),
                MAX_BATCH_SIZE
            )));
        }

        let mut urls = Vec::with_capacity(items.len());
        for item in &items {
            match validate_url(&item.original_url) {
                Ok(url) => urls.push(url.to_string()),
                Err(e) => {
                    return error_response(&ShortenerError::validation(format!(
                        "{}: {}",
                        item.correlation_id, e
                    )));
                }
            }
        }

        let writer = resolve_write_owner(&req, &state).await;
        let resp = match state.service.shorten_batch(&urls, writer.owner).await {
            Ok(keys) => {
                debug!("Batch of {} URLs shortened", keys.len());
                let body: Vec<BatchResponseItem> = items
                    .into_iter()
                    .zip(keys)
                    .map(|(item, key)| BatchResponseItem {
                        correlation_id: item.correlation_id,
                        short_url: state.short_url(&key),
                    })
                    .collect();
                HttpResponse::Created().json(body)
            }
            Err(e) => error_response(&e),
        };
        writer.apply(resp)
    }

    fn text(status: StatusCode, body: String) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header((CONTENT_TYPE, TEXT_PLAIN))
            .body(body)
    }
}

pub fn shorten_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::post().to(ShortenService::shorten_text))
        .route("/api/shorten", web::post().to(ShortenService::shorten_json))
        .route(
            "/api/shorten/batch",
            web::post().to(ShortenService::shorten_batch),
        );
}
