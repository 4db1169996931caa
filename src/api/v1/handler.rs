use super::error::*;
use crate::application_port::{
    AdminUserChanges, AuthService, LoginInput, ProfileChanges, RegisterInput, UserQuery,
    UserService,
};
use crate::domain_model::{Role, UserId, UserProfile};
use crate::logger::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

/// Uniform response envelope: `{success, data?, error?, message?, timestamp}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            message: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

pub async fn register(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = auth_service
        .register(RegisterInput {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            phone: body.phone,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok_with_message(
        SessionResponse {
            user: session.user,
            access_token: session.tokens.access_token.0,
            refresh_token: session.tokens.refresh_token.0,
        },
        "User registered successfully",
    );
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = auth_service
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok_with_message(
        SessionResponse {
            user: session.user,
            access_token: session.tokens.access_token.0,
            refresh_token: session.tokens.refresh_token.0,
        },
        "Login successful",
    );
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    body: RefreshTokenRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let grant = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok_with_message(grant, "Token refreshed successfully");
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

pub async fn logout(
    body: LogoutRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if let Some(refresh_token) = body.refresh_token.as_deref() {
        auth_service.logout(refresh_token).await;
    }

    let response = ApiResponse::<()>::message("Logged out successfully");
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    body: ForgotPasswordRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // The answer is identical whether the email matched, did not match, or
    // the store was down; anything else would confirm account existence.
    // Delivery of the token is out of scope here.
    if let Err(e) = auth_service.forgot_password(&body.email).await {
        warn!("forgot-password processing failed: {}", e);
    }

    let response = ApiResponse::<()>::message(
        "If an account with that email exists, a password reset link has been sent",
    );
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

pub async fn reset_password(
    body: ResetPasswordRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .reset_password(&body.token, &body.password)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::<()>::message("Password reset successful");
    Ok(warp::reply::json(&response))
}

pub async fn me(user: UserProfile) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(ProfileResponse {
        user,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

pub async fn update_profile(
    body: UpdateProfileRequest,
    user: UserProfile,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let updated = user_service
        .update_profile(
            user.id,
            ProfileChanges {
                first_name: body.first_name,
                last_name: body.last_name,
                phone: body.phone,
            },
        )
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok_with_message(
        ProfileResponse { user: updated },
        "Profile updated successfully",
    );
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    body: ChangePasswordRequest,
    user: UserProfile,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    user_service
        .change_password(user.id, &body.current_password, &body.new_password)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::<()>::message("Password changed successfully");
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn list_users(
    query: ListUsersQuery,
    _admin: UserProfile,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let page = user_service
        .list_users(UserQuery {
            page: query.page,
            limit: query.limit,
            role: query.role,
            is_active: query.is_active,
            search: query.search,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(page)))
}

pub async fn get_user(
    id: uuid::Uuid,
    _admin: UserProfile,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .get_user(UserId(id))
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(ProfileResponse {
        user,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_email_verified: Option<bool>,
    pub is_phone_verified: Option<bool>,
}

pub async fn update_user(
    id: uuid::Uuid,
    body: UpdateUserRequest,
    _admin: UserProfile,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .update_user(
            UserId(id),
            AdminUserChanges {
                first_name: body.first_name,
                last_name: body.last_name,
                phone: body.phone,
                role: body.role,
                is_active: body.is_active,
                is_email_verified: body.is_email_verified,
                is_phone_verified: body.is_phone_verified,
            },
        )
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response =
        ApiResponse::ok_with_message(ProfileResponse { user }, "User updated successfully");
    Ok(warp::reply::json(&response))
}

pub async fn delete_user(
    id: uuid::Uuid,
    admin: UserProfile,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    user_service
        .delete_user(UserId(id))
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    info!(deleted = %id, by = %admin.id, "user deleted by super admin");
    let response = ApiResponse::<()>::message("User deleted successfully");
    Ok(warp::reply::json(&response))
}

pub async fn set_user_active(
    id: uuid::Uuid,
    active: bool,
    _admin: UserProfile,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .set_user_active(UserId(id), active)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let message = if active {
        "User activated successfully"
    } else {
        "User deactivated successfully"
    };
    let response = ApiResponse::ok_with_message(ProfileResponse { user }, message);
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    let response = ApiResponse::ok(HealthResponse {
        service: "gatehouse",
        status: "healthy",
    });
    Ok(warp::reply::json(&response))
}
