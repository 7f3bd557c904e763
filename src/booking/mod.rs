pub mod availability;
mod form;
mod my_bookings;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};

use crate::{storage::MAX_FILE_SIZE, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/booking", get(form::booking_page).post(form::submit_booking))
        .route("/booking/unavailable/{room_id}", get(form::unavailable))
        .route("/my-bookings", get(my_bookings::my_bookings))
        .route("/my-bookings/{id}/cancel", post(my_bookings::cancel_booking))
        // room for the payment proof plus the text fields
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 64 * 1024))
}
