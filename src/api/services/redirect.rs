use actix_web::http::header::{CONTENT_TYPE, LOCATION};
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, trace};

use crate::api::constants::TEXT_PLAIN;
use crate::errors::ShortenerError;
use crate::utils::is_valid_key;

use super::helpers::{AppState, error_response};

pub struct RedirectService;

impl RedirectService {
    /// `GET /{key}`
    pub async fn handle_redirect(
        path: web::Path<String>,
        state: web::Data<AppState>,
    ) -> impl Responder {
        let key = path.into_inner();

        // 格式不合法的 key 不查存储
        if !is_valid_key(&key) {
            trace!("Invalid key rejected: {}", key);
            return Self::bad_request();
        }

        match state.service.original_url(&key).await {
            Ok(url) => {
                trace!("Redirect {} -> {}", key, url);
                HttpResponse::TemporaryRedirect()
                    .insert_header((LOCATION, url))
                    .finish()
            }
            Err(ShortenerError::Gone(_)) => {
                debug!("Key {} was deleted", key);
                HttpResponse::Gone()
                    .insert_header((CONTENT_TYPE, TEXT_PLAIN))
                    .body("Gone")
            }
            Err(ShortenerError::NotFound(_)) => Self::bad_request(),
            Err(e) => error_response(&e),
        }
    }

    fn bad_request() -> HttpResponse {
        HttpResponse::BadRequest()
            .insert_header((CONTENT_TYPE, TEXT_PLAIN))
            .body("Bad Request")
    }
}

/// Must be registered after every other single-segment GET route.
pub fn redirect_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{key}", web::get().to(RedirectService::handle_redirect));
}
