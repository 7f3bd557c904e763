use std::sync::Arc;

use anyhow::anyhow;
use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    config::Config,
    session::{signed_in_cookie, CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
    AppError, AppResult, AppState, GetField,
};

use super::{clients::ClientProvider, landing_url, start_session, Clients};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// Asks the provider which email address the token belongs to.
async fn provider_email(http_client: &reqwest::Client, provider: ClientProvider, access_token: &str) -> AppResult<String> {
    match provider {
        ClientProvider::Google => {
            let body: Value = http_client
                .get("https://www.googleapis.com/oauth2/v2/userinfo")
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(body.get_str_field("email")?)
        }
        ClientProvider::Github => {
            let emails: Vec<GithubEmail> = http_client
                .get("https://api.github.com/user/emails")
                .bearer_auth(access_token)
                .header(reqwest::header::USER_AGENT, "hotelbook")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            emails
                .into_iter()
                .filter(|e| e.verified)
                .max_by_key(|e| e.primary)
                .map(|e| e.email)
                .ok_or_else(|| anyhow!("github account has no verified email").into())
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    State(config): State<Arc<Config>>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or_else(|| AppError::bad_request("OAuth: without state"))?);
    let code = AuthorizationCode::new(code.ok_or_else(|| AppError::bad_request("OAuth: without code"))?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err(AppError::bad_request("no csrf_state"));
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err(AppError::bad_request("csrf tokens don't match"));
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err(AppError::bad_request("no pkce_verifier"));
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await
        .map_err(|e| anyhow!("{provider} token exchange failed: {e}"))?;

    let email = provider_email(&http_client, provider, token_result.access_token().secret()).await?;
    let return_url = session.remove::<String>(RETURN_URL).await?;

    let user = start_session(&db_pool, &config, &session, &email).await?;

    Ok((signed_in_cookie(), Redirect::to(&landing_url(return_url, &user))))
}
