use axum::{debug_handler, extract::Query, response::{IntoResponse, Redirect}};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::signed_out_cookie, AppResult};

use super::safe_return_url;

#[derive(Deserialize)]
pub(crate) struct SignoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler]
pub(crate) async fn signout(
    Query(SignoutQuery { return_url }): Query<SignoutQuery>,
    session: Session
) -> AppResult<impl IntoResponse> {
    session.flush().await?;
    let return_url = safe_return_url(return_url).unwrap_or_else(|| "/".to_owned());
    Ok((signed_out_cookie(), Redirect::to(&return_url)))
}
