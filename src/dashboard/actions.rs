use axum::{debug_handler, extract::{Path, State}, response::Redirect, Form};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{
    db::bookings::{self, BookingStatus},
    events::{self, BookingEvent, ChangeKind},
    session::Admin,
    AppError, AppResult, AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct StatusForm {
    status: BookingStatus,
}

#[debug_handler(state = AppState)]
pub(crate) async fn set_status(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<BookingEvent>>,
    Admin(admin): Admin,
    Path(booking_id): Path<i64>,
    Form(StatusForm { status }): Form<StatusForm>,
) -> AppResult<Redirect> {
    if !bookings::set_status(&db_pool, booking_id, status).await? {
        return Err(AppError::not_found("booking"));
    }

    tracing::info!(booking_id, %status, admin = %admin.email, "booking status changed");
    events::publish(&tx, ChangeKind::Update, booking_id);
    Ok(Redirect::to("/dashboard"))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_booking(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<BookingEvent>>,
    Admin(admin): Admin,
    Path(booking_id): Path<i64>,
) -> AppResult<Redirect> {
    if !bookings::delete(&db_pool, booking_id).await? {
        return Err(AppError::not_found("booking"));
    }

    tracing::info!(booking_id, admin = %admin.email, "booking deleted");
    events::publish(&tx, ChangeKind::Delete, booking_id);
    Ok(Redirect::to("/dashboard"))
}
