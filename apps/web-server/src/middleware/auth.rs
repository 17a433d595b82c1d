//! Authentication extractors.
//!
//! The access token travels either as `Authorization: Bearer <token>` or in
//! the `access_token` cookie set by the login form. Protected pages send
//! anonymous visitors to the login page with a `next` parameter.

use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use std::fmt;
use std::future::{Ready, ready};

use yatube_core::domain::ROLE_ADMIN;
use yatube_core::ports::{AuthError, TokenClaims};

use crate::state::AppState;

/// Cookie carrying the access token for browser sessions.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Where anonymous visitors are sent.
pub const LOGIN_URL: &str = "/auth/login/";

/// Authenticated user identity extractor.
///
/// List it first among handler arguments so the login redirect happens
/// before any path or form extraction can fail.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: uuid::Uuid,
    pub username: String,
    pub roles: Vec<String>,
}

impl Identity {
    /// Check if the user has a specific role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_staff(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            roles: claims.roles,
        }
    }
}

/// Authentication failure. Answers with a redirect to the login page.
#[derive(Debug)]
pub struct AuthenticationError {
    pub cause: AuthError,
    /// Path and query the visitor was trying to reach.
    pub next: String,
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        tracing::debug!(cause = %self.cause, next = %self.next, "Redirecting to login");

        HttpResponse::Found()
            .insert_header((header::LOCATION, login_url(&self.next)))
            .finish()
    }
}

/// `/auth/login/?next=<next>`.
pub fn login_url(next: &str) -> String {
    format!("{LOGIN_URL}?next={}", percent_encode(next))
}

/// Percent-encode a query value, leaving unreserved characters and `/` intact.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn extract_token(req: &HttpRequest) -> Result<String, AuthError> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let auth_str = value
            .to_str()
            .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

        return auth_str
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()));
    }

    req.cookie(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::MissingAuth)
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AuthError> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        tracing::error!("AppState not found in app data");
        AuthError::InvalidToken("Server configuration error".to_string())
    })?;

    let token = extract_token(req)?;
    let claims = state.tokens.validate_token(&token)?;

    Ok(Identity::from(claims))
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(|cause| AuthenticationError {
            cause,
            next: req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string()),
        }))
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(authenticate(req).ok())))
    }
}
