//! Global admission middleware
//!
//! Every request takes one slot of the shared sliding window before it
//! reaches a handler. A full window answers 429 without touching storage.
//! Without a limiter every request passes through.

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{CONTENT_TYPE, RETRY_AFTER},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;

use crate::api::constants::TEXT_PLAIN;
use crate::services::AdmissionLimiter;

/// Admission control middleware factory
#[derive(Clone)]
pub struct AdmissionControl {
    limiter: Option<Arc<AdmissionLimiter>>,
}

impl AdmissionControl {
    pub fn new(limiter: Arc<AdmissionLimiter>) -> Self {
        Self {
            limiter: Some(limiter),
        }
    }

    pub fn from_limiter(limiter: Option<Arc<AdmissionLimiter>>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionControl
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdmissionControlMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionControlMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct AdmissionControlMiddleware<S> {
    service: Rc<S>,
    limiter: Option<Arc<AdmissionLimiter>>,
}

impl<S, B> Service<ServiceRequest> for AdmissionControlMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(limiter) = &self.limiter
            && let Err(e) = limiter.admit()
        {
            warn!("Request {} {} rejected: {}", req.method(), req.path(), e);
            let retry_after = limiter.window().as_secs().max(1).to_string();
            return Box::pin(async move {
                Ok(req.into_response(
                    HttpResponse::TooManyRequests()
                        .insert_header((CONTENT_TYPE, TEXT_PLAIN))
                        .insert_header((RETRY_AFTER, retry_after))
                        .body("Too Many Requests")
                        .map_into_right_body(),
                ))
            });
        }

        let srv = self.service.clone();
        Box::pin(async move {
            let res = srv.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
