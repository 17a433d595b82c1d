//! Authentication handlers.

use actix_web::cookie::Cookie;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use yatube_core::domain::User;
use yatube_core::error::RepoError;
use yatube_shared::Rendered;
use yatube_shared::dto::{AuthResponse, LoginRequest, SignupRequest, UserResponse};

use super::views::redirect;
use crate::middleware::auth::{ACCESS_TOKEN_COOKIE, Identity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(ACCESS_TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish()
}

fn issue_token(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state
        .tokens
        .generate_token(user.id, &user.username, user.roles())?;

    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    })
}

/// GET /auth/login/
pub async fn login_page(query: web::Query<NextQuery>) -> HttpResponse {
    HttpResponse::Ok().json(Rendered::new("users/login.html", query.into_inner()))
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let username = req.username.trim();

    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.users.find_by_username(username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash = state.passwords.hash(&req.password)?;

    let user = match state
        .users
        .create(User::new(username.to_string(), req.email, password_hash))
        .await
    {
        Ok(user) => user,
        Err(RepoError::Constraint(_)) => {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

    Ok(HttpResponse::Created().json(issue_token(&state, &user)?))
}

/// POST /auth/login/ - sets the session cookie, then follows `next` if given.
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = form.into_inner();

    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !state.passwords.verify(&req.password, &user.password_hash)? {
        tracing::debug!(username = %req.username, "Login rejected");
        return Err(AppError::Unauthorized);
    }

    let auth = issue_token(&state, &user)?;
    let cookie = session_cookie(auth.access_token.clone());

    tracing::info!(username = %user.username, "User logged in");

    match safe_next(req.next.as_deref()) {
        Some(next) => {
            let mut response = redirect(next);
            response
                .add_cookie(&cookie)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            Ok(response)
        }
        None => Ok(HttpResponse::Ok().cookie(cookie).json(auth)),
    }
}

/// POST /auth/logout/
pub async fn logout() -> HttpResponse {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();

    HttpResponse::Found()
        .cookie(cookie)
        .insert_header((actix_web::http::header::LOCATION, "/"))
        .finish()
}

/// GET /auth/me/
pub async fn me(identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse {
        id: identity.user_id,
        username: identity.username,
        roles: identity.roles,
    })
}
