use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode, response::{Html, IntoResponse, Response}, routing::get, Form, Router};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    db::{messages::{self, NewMessage}, users::User},
    form::validation_message,
    include_res,
    mail::{Mailer, Template},
    res::{escape, Page},
    session::Viewer,
    AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(contact_page).post(send_message))
}

fn contact_form(config: &Config, user: Option<&User>, draft: Option<&NewMessage>, alert: Option<&str>) -> Html<String> {
    let field = |get: fn(&NewMessage) -> &str| draft.map(get).map(escape).unwrap_or_default();
    // signed-in users get their email prefilled
    let email = match draft {
        Some(draft) => escape(&draft.email),
        None => user.map(|u| escape(&u.email)).unwrap_or_default(),
    };

    let body = include_res!(str, "/pages/contact.html")
        .replace("{address}", &escape(&config.site.address))
        .replace("{phone}", &escape(&config.site.phone))
        .replace("{site_email}", &escape(&config.site.email))
        .replace("{name}", &field(|m| m.name.as_str()))
        .replace("{email}", &email)
        .replace("{sender_phone}", &field(|m| m.phone.as_str()))
        .replace("{subject}", &field(|m| m.subject.as_str()))
        .replace("{message}", &field(|m| m.message.as_str()));

    Page { title: "Contact", site: &config.site, user, alert }.render(&body)
}

#[debug_handler(state = AppState)]
pub(crate) async fn contact_page(State(config): State<Arc<Config>>, Viewer(user): Viewer) -> Html<String> {
    contact_form(&config, user.as_ref(), None, None)
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(mailer): State<Mailer>,
    Viewer(user): Viewer,
    Form(msg): Form<NewMessage>,
) -> AppResult<Response> {
    if let Err(errors) = msg.validate() {
        let page = contact_form(&config, user.as_ref(), Some(&msg), Some(&validation_message(&errors)));
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    let id = messages::insert(&db_pool, &msg).await?;
    tracing::info!(message_id = id, "contact message from {}", msg.email);

    mailer.send_later(
        Template::ContactMessage,
        json!({
            "from_name": msg.name,
            "from_email": msg.email,
            "phone": msg.phone,
            "subject": msg.subject,
            "message": msg.message,
            "to_email": config.site.email,
        }),
    );

    let body = include_res!(str, "/pages/contact_sent.html").replace("{name}", &escape(&msg.name));
    let page = Page { title: "Message sent", site: &config.site, user: user.as_ref(), alert: None };
    Ok(page.render(&body).into_response())
}
