use std::sync::Arc;

use axum::{debug_handler, extract::State, response::Html};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;

use crate::{config::Config, db::rooms::{self, Room}, include_res, res::Page, session::Viewer, AppResult, AppState};

use super::room_card;

/// Up to `count` rooms picked at random for the home page.
pub(crate) fn featured(all: &[Room], count: usize) -> Vec<&Room> {
    all.choose_multiple(&mut rand::rng(), count).collect()
}

#[debug_handler(state = AppState)]
pub(crate) async fn rooms(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Viewer(user): Viewer,
) -> AppResult<Html<String>> {
    let all = rooms::list(&db_pool).await?;

    let room_cards: String = if all.is_empty() {
        r#"<p class="empty">No rooms are listed yet.</p>"#.to_owned()
    } else {
        all.iter().map(room_card).collect()
    };

    let page = Page { title: "Rooms", site: &config.site, user: user.as_ref(), alert: None };
    Ok(page.render(&include_res!(str, "/pages/rooms/rooms.html").replace("{room_cards}", &room_cards)))
}
