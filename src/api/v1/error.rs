use crate::api::v1::handler::ApiResponse;
use crate::application_port::AuthError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(code) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
        return Ok(warp::reply::with_status(json, code.status()));
    }

    if let Some(body_err) = err.find::<warp::body::BodyDeserializeError>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::BadRequest,
            body_err.to_string(),
        ));
        return Ok(warp::reply::with_status(json, StatusCode::BAD_REQUEST));
    }

    if err.is_not_found() || err.find::<warp::reject::MethodNotAllowed>().is_some() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::NotFound,
            "Resource not found",
        ));
        return Ok(warp::reply::with_status(json, StatusCode::NOT_FOUND));
    }

    warn!("unhandled rejection: {:?}", err);
    let json = warp::reply::json(&ApiResponse::<()>::err(
        ApiErrorCode::InternalError,
        ApiErrorCode::InternalError.to_string(),
    ));
    Ok(warp::reply::with_status(
        json,
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("Password must be at least 8 characters long")]
    WeakPassword,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("Access token is required")]
    AuthRequired,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("User not found")]
    NotFound,
    #[error("Invalid request")]
    BadRequest,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::AuthRequired => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::EmailTaken
            | ApiErrorCode::WeakPassword
            | ApiErrorCode::InvalidResetToken
            | ApiErrorCode::WrongPassword
            | ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::EmailTaken => ApiErrorCode::EmailTaken,
            AuthError::WeakPassword => ApiErrorCode::WeakPassword,
            AuthError::TokenInvalid | AuthError::TokenExpired => ApiErrorCode::InvalidToken,
            AuthError::ResetTokenInvalid => ApiErrorCode::InvalidResetToken,
            AuthError::WrongPassword => ApiErrorCode::WrongPassword,
            AuthError::UserNotFound => ApiErrorCode::NotFound,
            AuthError::Store(e) | AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_map_to_401() {
        for err in [AuthError::InvalidCredentials, AuthError::TokenInvalid, AuthError::TokenExpired]
        {
            assert_eq!(ApiErrorCode::from(err).status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn store_trouble_never_leaks_detail() {
        let code = ApiErrorCode::from(AuthError::Store("redis refused".to_string()));
        assert_eq!(code.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!code.to_string().contains("redis"));
    }
}
