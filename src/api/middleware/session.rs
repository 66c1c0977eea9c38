//! Owner session middleware
//!
//! 读取 owner cookie，校验通过后把 [`SessionOwner`] 放进请求扩展。
//! 无 cookie 或校验失败的请求照常放行，由各路由决定是否需要 owner。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::api::jwt::OwnerTokenService;
use crate::storage::OwnerId;

/// Owner resolved from a valid session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOwner(pub OwnerId);

impl SessionOwner {
    /// Owner attached to `req` by [`OwnerSession`], if any.
    pub fn from_request(req: &HttpRequest) -> Option<OwnerId> {
        req.extensions().get::<SessionOwner>().map(|s| s.0)
    }
}

/// Owner session middleware factory
#[derive(Clone)]
pub struct OwnerSession {
    tokens: Arc<OwnerTokenService>,
    cookie_name: Rc<str>,
}

impl OwnerSession {
    pub fn new(tokens: Arc<OwnerTokenService>, cookie_name: &str) -> Self {
        Self {
            tokens,
            cookie_name: Rc::from(cookie_name),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for OwnerSession
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = OwnerSessionMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OwnerSessionMiddleware {
            service: Rc::new(service),
            tokens: Arc::clone(&self.tokens),
            cookie_name: Rc::clone(&self.cookie_name),
        }))
    }
}

pub struct OwnerSessionMiddleware<S> {
    service: Rc<S>,
    tokens: Arc<OwnerTokenService>,
    cookie_name: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for OwnerSessionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(cookie) = req.cookie(&self.cookie_name) {
            match self.tokens.validate(cookie.value()) {
                Ok(owner) => {
                    trace!("Session owner {} for {}", owner, req.path());
                    req.extensions_mut().insert(SessionOwner(owner));
                }
                Err(e) => debug!("Ignoring invalid session cookie: {}", e),
            }
        }

        let srv = self.service.clone();
        Box::pin(async move { srv.call(req).await })
    }
}
