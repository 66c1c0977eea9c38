//! HTTP 帮助函数：共享状态、错误映射、owner cookie

use std::sync::Arc;

use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse};
use tracing::{error, warn};

use crate::api::constants::TEXT_PLAIN;
use crate::api::jwt::OwnerTokenService;
use crate::api::middleware::SessionOwner;
use crate::errors::ShortenerError;
use crate::services::UrlService;
use crate::storage::OwnerId;

/// State shared by every handler through `web::Data`.
pub struct AppState {
    pub service: Arc<UrlService>,
    pub tokens: Arc<OwnerTokenService>,
    /// Prefix of returned short URLs, without trailing slash
    pub base_url: String,
    pub cookie_name: String,
}

impl AppState {
    pub fn new(
        service: Arc<UrlService>,
        tokens: Arc<OwnerTokenService>,
        base_url: &str,
        cookie_name: &str,
    ) -> Self {
        Self {
            service,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_name: cookie_name.to_string(),
        }
    }

    pub fn short_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn owner_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.cookie_name.clone(), token);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(actix_web::cookie::time::Duration::hours(
            self.tokens.token_hours() as i64,
        ));
        cookie
    }
}

/// Owner of a write request, plus the cookie to set when it was just minted.
pub struct WriteOwner {
    pub owner: Option<OwnerId>,
    pub cookie: Option<Cookie<'static>>,
}

impl WriteOwner {
    pub fn apply(self, mut resp: HttpResponse) -> HttpResponse {
        if let Some(cookie) = self.cookie
            && let Err(e) = resp.add_cookie(&cookie)
        {
            warn!("Failed to attach owner cookie: {}", e);
        }
        resp
    }
}

/// Resolve the owner for a write route.
///
/// 没有有效 cookie 时创建新 owner 并签发 cookie；创建失败则按匿名写入。
pub async fn resolve_write_owner(req: &HttpRequest, state: &AppState) -> WriteOwner {
    if let Some(owner) = SessionOwner::from_request(req) {
        return WriteOwner {
            owner: Some(owner),
            cookie: None,
        };
    }

    let owner = match state.service.create_owner().await {
        Ok(owner) => owner,
        Err(e) => {
            warn!("Failed to create owner, storing anonymously: {}", e);
            return WriteOwner {
                owner: None,
                cookie: None,
            };
        }
    };

    match state.tokens.issue(owner) {
        Ok(token) => WriteOwner {
            owner: Some(owner),
            cookie: Some(state.owner_cookie(token)),
        },
        Err(e) => {
            error!("Failed to sign owner token: {}", e);
            WriteOwner {
                owner: None,
                cookie: None,
            }
        }
    }
}

/// HTTP status for errors that reach a handler boundary.
pub fn status_for(err: &ShortenerError) -> StatusCode {
    match err {
        ShortenerError::Conflict { .. } => StatusCode::CONFLICT,
        ShortenerError::NotFound(_) | ShortenerError::Validation(_) => StatusCode::BAD_REQUEST,
        ShortenerError::Gone(_) => StatusCode::GONE,
        ShortenerError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        ShortenerError::LimitReached(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 纯文本错误响应；内部错误不向客户端暴露细节
pub fn error_response(err: &ShortenerError) -> HttpResponse {
    let status = status_for(err);
    let body = if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
        error!("Request failed: {}", err.format_simple());
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string()
    } else {
        err.message().to_string()
    };

    HttpResponse::build(status)
        .insert_header((CONTENT_TYPE, TEXT_PLAIN))
        .body(body)
}

pub fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((CONTENT_TYPE, TEXT_PLAIN))
        .body("Unauthorized")
}
