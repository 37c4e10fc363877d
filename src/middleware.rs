use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::{ok, ready, Ready};
use log::debug;
use mongodb::bson::oid::ObjectId;

use crate::app_state::AppState;
use crate::error::ApiError;

/// Identity proven by a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: ObjectId,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<AuthUser>().copied().ok_or(ApiError::MissingToken))
    }
}

/// Rejects requests without a valid `Authorization: Bearer <token>` header
/// before they reach the wrapped handlers.
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_boxed_body())
                })
            }
            Err(err) => {
                let (http_req, _payload) = req.into_parts();
                let resp = ServiceResponse::new(http_req, err.error_response());
                Box::pin(async move { Ok(resp) })
            }
        }
    }
}

fn authenticate(req: &ServiceRequest) -> Result<AuthUser, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::MissingToken)?;

    let data = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state is not registered".to_string()))?;

    let claims = data.auth.keys().validate_jwt(token).map_err(|e| {
        debug!("Token rejected: {}", e);
        ApiError::InvalidToken
    })?;
    let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| ApiError::InvalidToken)?;

    Ok(AuthUser { user_id })
}

/// Extracts the token from "Bearer <token>"; any other shape counts as absent.
fn bearer_token(headers: &http::header::HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
