use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, response::{Html, Redirect}};
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{
    config::Config,
    db::bookings::{self, BookingStatus, BookingWithRoom},
    events::{self, BookingEvent, ChangeKind},
    include_res,
    res::{escape, Page},
    rooms::money,
    session::SignedIn,
    AppError, AppResult, AppState,
};

fn booking_row(row: &BookingWithRoom) -> String {
    let b = &row.booking;
    let cancel = if b.status == BookingStatus::Pending {
        format!(
            r#"<form method="post" action="/my-bookings/{}/cancel" onsubmit="return confirm('Cancel this booking?')"><button class="danger">Cancel</button></form>"#,
            b.id
        )
    } else {
        String::new()
    };

    include_res!(str, "/pages/booking/my_booking_row.html")
        .replace("{room_name}", &escape(row.room_name.as_deref().unwrap_or("(room removed)")))
        .replace("{check_in}", &b.check_in.to_string())
        .replace("{check_out}", &b.check_out.to_string())
        .replace("{guests}", &b.guests.to_string())
        .replace("{total_cost}", &money(b.total_cost))
        .replace("{status}", b.status.as_str())
        .replace("{actions}", &cancel)
}

#[debug_handler(state = AppState)]
pub(crate) async fn my_bookings(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    SignedIn(user): SignedIn,
) -> AppResult<Html<String>> {
    let rows = bookings::for_email(&db_pool, &user.email).await?;

    let booking_rows: String = if rows.is_empty() {
        r#"<tr><td colspan="7" class="empty">No bookings yet. <a href="/booking">Book a room</a>.</td></tr>"#.to_owned()
    } else {
        rows.iter().map(booking_row).collect()
    };

    let password_link = match user.password_hash {
        Some(_) => "",
        None => r#"<p><a href="/account/password">Add a password</a> to sign in with your email too.</p>"#,
    };

    let page = Page { title: "My Bookings", site: &config.site, user: Some(&user), alert: None };
    Ok(page.render(
        &include_res!(str, "/pages/booking/my_bookings.html")
            .replace("{booking_rows}", &booking_rows)
            .replace("{password_link}", password_link),
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn cancel_booking(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<BookingEvent>>,
    SignedIn(user): SignedIn,
    Path(booking_id): Path<i64>,
) -> AppResult<Redirect> {
    let booking = bookings::get(&db_pool, booking_id)
        .await?
        .filter(|b| b.guest_email.eq_ignore_ascii_case(&user.email))
        .ok_or_else(|| AppError::not_found("booking"))?;

    if booking.status != BookingStatus::Pending {
        return Err(AppError::bad_request(format!("a {} booking can't be cancelled online", booking.status)));
    }

    bookings::set_status(&db_pool, booking_id, BookingStatus::Cancelled).await?;
    tracing::info!(booking_id, user_id = %user.id, "guest cancelled booking");
    events::publish(&tx, ChangeKind::Update, booking_id);

    Ok(Redirect::to("/my-bookings"))
}
