use std::sync::Arc;

use axum::{debug_handler, extract::State, response::Html};
use sqlx::SqlitePool;

use crate::{config::Config, db::rooms, include_res, res::{escape, Page}, rooms::{featured, room_card}, session::Viewer, AppResult, AppState};

const FEATURED_ROOMS: usize = 3;

#[debug_handler(state = AppState)]
pub async fn home(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Viewer(user): Viewer,
) -> AppResult<Html<String>> {
    let all = rooms::list(&db_pool).await?;
    let room_cards: String = featured(&all, FEATURED_ROOMS).into_iter().map(room_card).collect();

    let body = include_res!(str, "/pages/home.html")
        .replace("{site_name}", &escape(&config.site.name))
        .replace("{tagline}", &escape(&config.site.tagline))
        .replace("{room_cards}", &room_cards);

    let page = Page { title: "Welcome", site: &config.site, user: user.as_ref(), alert: None };
    Ok(page.render(&body))
}
