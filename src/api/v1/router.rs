use super::error::*;
use super::handler;
use super::handler::ListUsersQuery;
use crate::application_port::AuthService;
use crate::domain_model::{Role, UserProfile};
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];
const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh_token = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("refresh-token"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh_token);

    let logout = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let forgot_password = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("forgot-password"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::forgot_password);

    let reset_password = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("reset-password"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::reset_password);

    let me = warp::get()
        .and(warp::path("auth"))
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_authentication(server.auth_service.clone()))
        .and_then(handler::me);

    let update_profile = warp::put()
        .and(warp::path("users"))
        .and(warp::path("profile"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_authentication(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::update_profile);

    let change_password = warp::post()
        .and(warp::path("users"))
        .and(warp::path("change-password"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_authentication(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::change_password);

    let list_users = warp::get()
        .and(warp::path("auth"))
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(warp::query::<ListUsersQuery>())
        .and(with_role(server.auth_service.clone(), ADMIN_ROLES))
        .and(with(server.user_service.clone()))
        .and_then(handler::list_users);

    let get_user = warp::get()
        .and(warp::path("auth"))
        .and(warp::path("users"))
        .and(warp::path::param::<uuid::Uuid>())
        .and(warp::path::end())
        .and(with_role(server.auth_service.clone(), ADMIN_ROLES))
        .and(with(server.user_service.clone()))
        .and_then(handler::get_user);

    let update_user = warp::put()
        .and(warp::path("auth"))
        .and(warp::path("users"))
        .and(warp::path::param::<uuid::Uuid>())
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_role(server.auth_service.clone(), ADMIN_ROLES))
        .and(with(server.user_service.clone()))
        .and_then(handler::update_user);

    let delete_user = warp::delete()
        .and(warp::path("auth"))
        .and(warp::path("users"))
        .and(warp::path::param::<uuid::Uuid>())
        .and(warp::path::end())
        .and(with_role(server.auth_service.clone(), SUPER_ADMIN_ONLY))
        .and(with(server.user_service.clone()))
        .and_then(handler::delete_user);

    let activate_user = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("users"))
        .and(warp::path::param::<uuid::Uuid>())
        .and(warp::path("activate"))
        .and(warp::path::end())
        .and(with_flag(true))
        .and(with_role(server.auth_service.clone(), ADMIN_ROLES))
        .and(with(server.user_service.clone()))
        .and_then(handler::set_user_active);

    let deactivate_user = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("users"))
        .and(warp::path::param::<uuid::Uuid>())
        .and(warp::path("deactivate"))
        .and(warp::path::end())
        .and(with_flag(false))
        .and(with_role(server.auth_service.clone(), ADMIN_ROLES))
        .and(with(server.user_service.clone()))
        .and_then(handler::set_user_active);

    register
        .or(login)
        .or(refresh_token)
        .or(logout)
        .or(forgot_password)
        .or(reset_password)
        .or(me)
        .or(update_profile)
        .or(change_password)
        .or(list_users)
        .or(get_user)
        .or(update_user)
        .or(delete_user)
        .or(activate_user)
        .or(deactivate_user)
}

pub fn health_routes()
-> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and_then(handler::health)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_flag(value: bool) -> impl Filter<Extract = (bool,), Error = Infallible> + Clone {
    warp::any().map(move || value)
}

/// Bearer authentication: resolves the access token to a live user or
/// rejects with 401. A missing header is its own 401, not a 400.
fn with_authentication(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserProfile,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth_service = auth_service.clone();
        async move {
            let token = header
                .as_deref()
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or_else(|| reject::custom(ApiErrorCode::AuthRequired))?;
            auth_service
                .authenticate(token)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)
        }
    })
}

/// Role guard layered on top of authentication; rejects with 403 so a
/// logged-in caller can tell "who are you" from "you may not".
fn with_role(
    auth_service: Arc<dyn AuthService>,
    allowed: &'static [Role],
) -> impl Filter<Extract = (UserProfile,), Error = warp::Rejection> + Clone {
    with_authentication(auth_service).and_then(move |user: UserProfile| async move {
        if allowed.contains(&user.role) {
            Ok(user)
        } else {
            Err(reject::custom(ApiErrorCode::Forbidden))
        }
    })
}
