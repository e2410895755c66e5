use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::http::AppError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_PATH: &str = "/auth/login/";

/// The signed-in user for the current request. Handlers that take it directly
/// require a session; `Option<AuthUser>` accepts anonymous viewers too.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let next = parts
            .uri
            .path_and_query()
            .map(|value| value.as_str())
            .unwrap_or("/");

        let token = match jar.get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => return Err(login_redirect(next).into_response()),
        };

        let service = AuthService::new(
            state.db.clone(),
            state.session_key,
            state.session_ttl_hours,
        );
        let session = service.authenticate_session(&token).await.map_err(|err| {
            tracing::error!(error = ?err, "failed to authenticate session");
            AppError::internal("failed to authenticate").into_response()
        })?;

        match session {
            Some(session) => Ok(AuthUser {
                user_id: session.user_id,
                username: session.username,
            }),
            None => Err(login_redirect(next).into_response()),
        }
    }
}

/// `303` to the login page, carrying where to return afterwards.
pub fn login_redirect(next: &str) -> Redirect {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    Redirect::to(&format!("{}?next={}", LOGIN_PATH, encoded))
}

/// Only same-site absolute paths are followed after login. Browsers drop tabs
/// and newlines from URLs, so those never count as local.
pub fn is_local_path(next: &str) -> bool {
    if next.chars().any(|c| c.is_ascii_control()) {
        return false;
    }
    let mut chars = next.chars();
    match (chars.next(), chars.next()) {
        (Some('/'), Some('/' | '\\')) => false,
        (Some('/'), _) => true,
        _ => false,
    }
}

/// Where a successful login lands: `next` when it is a local path that can be
/// sent as a `Location` header, the index otherwise.
pub fn redirect_after_login(next: Option<&str>) -> Redirect {
    match next {
        Some(next) if is_local_path(next) && HeaderValue::try_from(next).is_ok() => {
            Redirect::to(next)
        }
        _ => Redirect::to("/"),
    }
}

pub fn session_cookie(token: String, expires_at: OffsetDateTime) -> Cookie<'static> {
    let max_age = (expires_at - OffsetDateTime::now_utc()).max(time::Duration::ZERO);
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

pub fn session_cookie_removal() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
