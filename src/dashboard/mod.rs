mod actions;
mod list;
mod ws;

use axum::{routing::{get, post}, Router};

pub use list::BookingFilter;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::dashboard))
        .route("/bookings", get(list::booking_rows))
        .route("/bookings/{id}/status", post(actions::set_status))
        .route("/bookings/{id}/delete", post(actions::delete_booking))
        .route("/ws", get(ws::dashboard_ws))
}
