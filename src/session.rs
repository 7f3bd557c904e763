use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{header, request::Parts, HeaderMap, HeaderName},
    response::AppendHeaders,
};
use tower_sessions::{
    cookie::{Cookie, SameSite},
    Session,
};

use crate::{db::users::{self, User}, AppError, AppState};

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// Outlives the session (no max-age), so a session that expired from inactivity
/// can be told apart from a visitor who never signed in.
pub const SIGNED_IN_COOKIE: &str = "signed_in";

type SetCookie = AppendHeaders<[(HeaderName, String); 1]>;

pub fn signed_in_cookie() -> SetCookie {
    let cookie = Cookie::build((SIGNED_IN_COOKIE, "1"))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    AppendHeaders([(header::SET_COOKIE, cookie.to_string())])
}

pub fn signed_out_cookie() -> SetCookie {
    let cookie = Cookie::build((SIGNED_IN_COOKIE, "")).path("/").removal().build();
    AppendHeaders([(header::SET_COOKIE, cookie.to_string())])
}

pub(crate) fn had_signed_in(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .any(|cookie| cookie.name() == SIGNED_IN_COOKIE && !cookie.value().is_empty())
}

async fn session_user(parts: &mut Parts, state: &AppState) -> Result<Option<User>, AppError> {
    if let Some(user) = parts.extensions.get::<User>() {
        return Ok(Some(user.clone()));
    }

    let session = Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| anyhow::anyhow!(msg))?;
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Ok(None);
    };

    let user = users::get(&state.db_pool, &user_id).await?;
    match &user {
        Some(user) => {
            parts.extensions.insert(user.clone());
        }
        // row deleted under a live session
        None => session.clear().await,
    }
    Ok(user)
}

fn sign_in_redirect(parts: &Parts) -> AppError {
    // nested routers only see the stripped uri
    let uri = parts.extensions.get::<OriginalUri>().map(|o| &o.0).unwrap_or(&parts.uri);
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    let mut to = format!("/signin?return_url={}", urlencoding::encode(path));
    if had_signed_in(&parts.headers) {
        to += "&expired=1";
    }
    AppError::Redirect(to)
}

/// Whoever is looking at the page, if signed in.
pub struct Viewer(pub Option<User>);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Viewer(session_user(parts, state).await?))
    }
}

/// Any signed-in user. Anonymous visitors are sent to the sign-in page.
pub struct SignedIn(pub User);

impl FromRequestParts<AppState> for SignedIn {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match session_user(parts, state).await? {
            Some(user) => Ok(SignedIn(user)),
            None => Err(sign_in_redirect(parts)),
        }
    }
}

/// A signed-in user with the admin role.
pub struct Admin(pub User);

impl FromRequestParts<AppState> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match session_user(parts, state).await? {
            Some(user) if user.is_admin() => Ok(Admin(user)),
            Some(user) => {
                tracing::warn!(user_id = %user.id, uri = %parts.uri, "non-admin tried an admin page");
                Err(AppError::forbidden())
            }
            None => Err(sign_in_redirect(parts)),
        }
    }
}
