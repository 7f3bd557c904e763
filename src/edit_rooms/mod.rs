mod form;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};

use crate::{storage::MAX_FILE_SIZE, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(form::room_list).post(form::create_room))
        .route("/{id}", get(form::edit_page).post(form::update_room))
        .route("/{id}/delete", post(form::delete_room))
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 64 * 1024))
}
