use axum::{debug_handler, extract::{Path, Query, State}, http::StatusCode, response::{Html, IntoResponse, Redirect, Response}, Form};
use oauth2::{CsrfToken, PkceCodeChallenge};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_sessions::Session;
use validator::Validate;

use crate::{
    config::Config,
    db::users::{self, User},
    form::validation_message,
    include_res,
    res::{escape, Page},
    session::{signed_in_cookie, signed_out_cookie, SignedIn, Viewer, CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
    AppResult, AppState,
};

use super::{
    clients::ClientProvider,
    password::{hash_password, verify_password},
    landing_url, role_for, safe_return_url, start_session, Clients,
};

#[derive(Deserialize)]
pub(crate) struct ReturnUrlQuery {
    pub(crate) return_url: Option<String>,
    pub(crate) expired: Option<String>,
}

#[derive(Deserialize, Validate)]
pub(crate) struct SignInForm {
    #[validate(email(message = "enter a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "enter your password"))]
    password: String,
    return_url: Option<String>,
}

#[derive(Deserialize, Validate)]
pub(crate) struct SignUpForm {
    #[validate(email(message = "enter a valid email address"))]
    email: String,
    #[validate(length(min = 8, message = "passwords need at least 8 characters"))]
    password: String,
    #[validate(must_match(other = "password", message = "passwords don't match"))]
    confirm: String,
    return_url: Option<String>,
}

#[derive(Deserialize, Validate)]
pub(crate) struct SetPasswordForm {
    #[validate(length(min = 8, message = "passwords need at least 8 characters"))]
    password: String,
    #[validate(must_match(other = "password", message = "passwords don't match"))]
    confirm: String,
}

/// `?return_url=...` ready to sit inside an href, or nothing.
fn return_query(return_url: Option<&str>) -> String {
    match return_url {
        Some(url) => format!("?return_url={}", escape(&urlencoding::encode(url))),
        None => String::new(),
    }
}

fn auth_body(
    template: &str,
    title: &str,
    config: &Config,
    clients: &Clients,
    return_url: Option<&str>,
    email: &str,
    alert: Option<&str>,
) -> Html<String> {
    let query = return_query(return_url);
    let providers: String = clients
        .providers()
        .into_iter()
        .map(|p| format!(r#"<a class="button oauth" href="/signin/{}{query}">Continue with {p}</a>"#, p.slug()))
        .collect();

    let page = Page { title, site: &config.site, user: None, alert };
    page.render(
        &template
            .replace("{return_url}", &escape(return_url.unwrap_or_default()))
            .replace("{return_query}", &query)
            .replace("{email}", &escape(email))
            .replace("{providers}", &providers),
    )
}

fn auth_page(
    template: &str,
    title: &str,
    config: &Config,
    clients: &Clients,
    return_url: Option<&str>,
    email: &str,
    alert: Option<&str>,
) -> Response {
    let body = auth_body(template, title, config, clients, return_url, email, alert);
    match alert {
        Some(_) => (StatusCode::BAD_REQUEST, body).into_response(),
        None => body.into_response(),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn signin_page(
    Query(ReturnUrlQuery { return_url, expired }): Query<ReturnUrlQuery>,
    State(config): State<Arc<Config>>,
    State(clients): State<Clients>,
    Viewer(user): Viewer,
) -> Response {
    if let Some(user) = user {
        return Redirect::to(&landing_url(return_url, &user)).into_response();
    }

    let return_url = safe_return_url(return_url);
    let template = include_res!(str, "/pages/signin.html");
    if expired.is_none() {
        return auth_page(template, "Sign in", &config, &clients, return_url.as_deref(), "", None);
    }

    let notice = format!(
        "You have been signed out after {} minutes of inactivity. Please sign in again.",
        config.session_inactivity_minutes
    );
    let body = auth_body(template, "Sign in", &config, &clients, return_url.as_deref(), "", Some(&notice));
    (signed_out_cookie(), body).into_response()
}

#[debug_handler(state = AppState)]
pub(crate) async fn signin(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(clients): State<Clients>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> AppResult<Response> {
    let return_url = safe_return_url(form.return_url.clone());
    let fail = |message: &str| {
        auth_page(include_res!(str, "/pages/signin.html"), "Sign in", &config, &clients, return_url.as_deref(), &form.email, Some(message))
    };

    if let Err(errors) = form.validate() {
        return Ok(fail(&validation_message(&errors)));
    }

    let known = users::by_email(&db_pool, &form.email).await?;
    let Some(hash) = known.as_ref().and_then(|u| u.password_hash.as_deref()) else {
        return Ok(fail("wrong email or password"));
    };
    if !verify_password(&form.password, hash) {
        tracing::warn!("failed sign-in for {}", form.email);
        return Ok(fail("wrong email or password"));
    }

    let user = start_session(&db_pool, &config, &session, &form.email).await?;
    Ok((signed_in_cookie(), Redirect::to(&landing_url(return_url, &user))).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup_page(
    Query(ReturnUrlQuery { return_url, .. }): Query<ReturnUrlQuery>,
    State(config): State<Arc<Config>>,
    State(clients): State<Clients>,
) -> Response {
    let return_url = safe_return_url(return_url);
    auth_page(include_res!(str, "/pages/signup.html"), "Sign up", &config, &clients, return_url.as_deref(), "", None)
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(clients): State<Clients>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> AppResult<Response> {
    let return_url = safe_return_url(form.return_url.clone());
    let fail = |message: &str| {
        auth_page(include_res!(str, "/pages/signup.html"), "Sign up", &config, &clients, return_url.as_deref(), &form.email, Some(message))
    };

    if let Err(errors) = form.validate() {
        return Ok(fail(&validation_message(&errors)));
    }

    // a row made by an OAuth sign-in only gets a password from inside that session
    if users::by_email(&db_pool, &form.email).await?.is_some() {
        return Ok(fail("an account with that email already exists"));
    }

    let hash = hash_password(&form.password)?;
    let role = role_for(&config, &form.email);
    if users::create(&db_pool, &form.email, Some(&hash), role).await?.is_none() {
        return Ok(fail("an account with that email already exists"));
    }

    let user = start_session(&db_pool, &config, &session, &form.email).await?;
    Ok((signed_in_cookie(), Redirect::to(&landing_url(return_url, &user))).into_response())
}

fn password_form(config: &Config, user: &User, alert: Option<&str>) -> Response {
    let page = Page { title: "Add a password", site: &config.site, user: Some(user), alert };
    let body = page.render(&include_res!(str, "/pages/account_password.html").replace("{email}", &escape(&user.email)));

    match alert {
        Some(_) => (StatusCode::BAD_REQUEST, body).into_response(),
        None => body.into_response(),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn password_page(State(config): State<Arc<Config>>, SignedIn(user): SignedIn) -> Response {
    password_form(&config, &user, None)
}

/// Lets an account that only ever used OAuth add a password for email sign-in.
#[debug_handler(state = AppState)]
pub(crate) async fn set_password(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    SignedIn(user): SignedIn,
    Form(form): Form<SetPasswordForm>,
) -> AppResult<Response> {
    if user.password_hash.is_some() {
        return Ok(password_form(&config, &user, Some("your account already has a password")));
    }
    if let Err(errors) = form.validate() {
        return Ok(password_form(&config, &user, Some(&validation_message(&errors))));
    }

    let hash = hash_password(&form.password)?;
    users::set_password(&db_pool, &user.id, &hash).await?;
    tracing::info!(user_id = %user.id, "password added");

    Ok(Redirect::to("/my-bookings").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn oauth_start(
    Path(provider): Path<ClientProvider>,
    Query(ReturnUrlQuery { return_url, .. }): Query<ReturnUrlQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes())
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    if let Some(return_url) = safe_return_url(return_url) {
        session.insert(RETURN_URL, return_url).await?;
    }

    Ok(Redirect::to(authorize_url.as_str()).into_response())
}
