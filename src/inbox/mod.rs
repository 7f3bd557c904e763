use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, response::{Html, Redirect}, routing::{get, post}, Router};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    db::messages::{self, ContactMessage},
    include_res,
    res::{escape, Page},
    session::Admin,
    AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(inbox))
        .route("/{id}/delete", post(delete_message))
}

fn message_item(msg: &ContactMessage) -> String {
    let phone = if msg.phone.is_empty() { String::new() } else { format!(" · {}", escape(&msg.phone)) };

    include_res!(str, "/pages/inbox/message.html")
        .replace("{id}", &msg.id.to_string())
        .replace("{subject}", &escape(&msg.subject))
        .replace("{name}", &escape(&msg.name))
        .replace("{email}", &escape(&msg.email))
        .replace("{phone}", &phone)
        .replace("{sent_at}", &msg.created_at.date().to_string())
        .replace("{message}", &escape(&msg.message).replace('\n', "<br>"))
}

#[debug_handler(state = AppState)]
async fn inbox(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Admin(user): Admin,
) -> AppResult<Html<String>> {
    let all = messages::list(&db_pool).await?;

    let items: String = if all.is_empty() {
        r#"<p class="empty">The inbox is empty.</p>"#.to_owned()
    } else {
        all.iter().map(message_item).collect()
    };

    let body = include_res!(str, "/pages/inbox/inbox.html")
        .replace("{count}", &all.len().to_string())
        .replace("{messages}", &items);

    Ok(Page { title: "Inbox", site: &config.site, user: Some(&user), alert: None }.render(&body))
}

#[debug_handler(state = AppState)]
async fn delete_message(
    State(db_pool): State<SqlitePool>,
    Admin(admin): Admin,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    if !messages::delete(&db_pool, id).await? {
        return Err(AppError::not_found("message"));
    }
    tracing::info!(message_id = id, admin = %admin.email, "contact message deleted");
    Ok(Redirect::to("/inbox"))
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn messages_are_escaped_and_keep_line_breaks() {
        let item = message_item(&ContactMessage {
            id: 9,
            name: "Mallory".to_owned(),
            email: "m@example.com".to_owned(),
            phone: String::new(),
            subject: "<script>".to_owned(),
            message: "line one\nline two".to_owned(),
            created_at: OffsetDateTime::now_utc(),
        });

        assert!(item.contains("&lt;script&gt;"));
        assert!(item.contains("line one<br>line two"));
        assert!(item.contains("/inbox/9/delete"));
    }
}
