use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Every failure a request handler can produce.
///
/// The status code and the machine-readable `code` are derived from the
/// variant; internal failures are logged and answered with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Access denied")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    msg: String,
    code: &'a str,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::Conflict(_) => "conflict",
            ApiError::NotFound(_) => "not_found",
            ApiError::MissingToken => "missing_token",
            ApiError::InvalidToken => "invalid_token",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Storage(_)
            | ApiError::Hash(_)
            | ApiError::Token(_)
            | ApiError::Internal(_) => "internal_error",
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Storage(_) | ApiError::Hash(_) | ApiError::Token(_) | ApiError::Internal(_)
        )
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_)
            | ApiError::Hash(_)
            | ApiError::Token(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let msg = if self.is_internal() {
            error!("Request failed: {}", self);
            "Something went wrong on the server, please try again".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            msg,
            code: self.code(),
        })
    }
}
