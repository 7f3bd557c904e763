use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, response::Html};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    db::rooms,
    include_res,
    res::{escape, markdown, Page},
    session::Viewer,
    AppError, AppResult, AppState,
};

use super::{image_or_placeholder, money};

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Viewer(user): Viewer,
    Path(room_id): Path<i64>,
) -> AppResult<Html<String>> {
    let Some(room) = rooms::get(&db_pool, room_id).await? else {
        return Err(AppError::not_found("room"));
    };

    let amenities: String = room
        .amenities()
        .into_iter()
        .map(|a| format!("<li>{}</li>", escape(a)))
        .collect();

    let body = include_res!(str, "/pages/rooms/room.html")
        .replace("{id}", &room.id.to_string())
        .replace("{image_url}", &image_or_placeholder(&room))
        .replace("{cost}", &money(room.cost))
        .replace("{size}", &escape(&room.size))
        .replace("{occupancy}", &room.occupancy.to_string())
        .replace("{bed_type}", &escape(&room.bed_type))
        .replace("{view}", &escape(&room.view))
        .replace("{check_in_time}", &escape(&room.check_in_time))
        .replace("{check_out_time}", &escape(&room.check_out_time))
        .replace("{amenities}", &amenities)
        .replace("{name}", &escape(&room.name))
        .replace("{description}", &markdown(&room.description))
        .replace("{rules}", &markdown(&room.rules));

    let page = Page { title: &room.name, site: &config.site, user: user.as_ref(), alert: None };
    Ok(page.render(&body))
}
