use std::sync::Arc;

use axum::{debug_handler, extract::{Query, State}, response::Html};
use serde::Deserialize;
use sqlx::SqlitePool;
use time::{Date, OffsetDateTime};

use crate::{
    booking::availability::parse_date,
    config::Config,
    db::bookings::{self, BookingStatus, BookingWithRoom},
    include_res,
    res::{escape, Page, LOADING},
    rooms::money,
    session::Admin,
    AppResult, AppState,
};

/// Search box, status dropdown, date range dropdown and day picker of the dashboard.
#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: String,
    /// `today` (arriving today), `upcoming` (arriving later) or `past` (already checked out).
    #[serde(default)]
    pub date: String,
    /// A single night the stay must cover.
    #[serde(default)]
    pub day: String,
}

impl BookingFilter {
    pub fn matches(&self, row: &BookingWithRoom, today: Date) -> bool {
        let b = &row.booking;

        let q = self.q.trim().to_lowercase();
        if !q.is_empty() {
            let room_name = row.room_name.as_deref().unwrap_or_default();
            let hit = [b.guest_name.as_str(), b.guest_email.as_str(), b.guest_phone.as_str(), room_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&q));
            if !hit {
                return false;
            }
        }

        // "all" and unknown values leave the status unfiltered
        if let Ok(status) = self.status.parse::<BookingStatus>() {
            if b.status != status {
                return false;
            }
        }

        let in_range = match self.date.as_str() {
            "today" => b.check_in == today,
            "upcoming" => b.check_in > today,
            "past" => b.check_out < today,
            _ => true,
        };
        if !in_range {
            return false;
        }

        if let Some(day) = parse_date(&self.day) {
            if day < b.check_in || day > b.check_out {
                return false;
            }
        }

        true
    }
}

fn booking_row(row: &BookingWithRoom) -> String {
    let b = &row.booking;
    let status_options: String = BookingStatus::ALL
        .iter()
        .map(|s| {
            format!(
                r#"<option value="{s}"{}>{s}</option>"#,
                if *s == b.status { " selected" } else { "" }
            )
        })
        .collect();
    let proof = match &b.payment_proof_url {
        Some(url) => format!(r#"<a href="{}" target="_blank">view</a>"#, escape(url)),
        None => "none".to_owned(),
    };

    include_res!(str, "/pages/dashboard/row.html")
        .replace("{id}", &b.id.to_string())
        .replace("{guest_name}", &escape(&b.guest_name))
        .replace("{guest_email}", &escape(&b.guest_email))
        .replace("{guest_phone}", &escape(&b.guest_phone))
        .replace("{room_name}", &escape(row.room_name.as_deref().unwrap_or("(room removed)")))
        .replace("{check_in}", &b.check_in.to_string())
        .replace("{check_out}", &b.check_out.to_string())
        .replace("{guests}", &b.guests.to_string())
        .replace("{total_cost}", &money(b.total_cost))
        .replace("{proof}", &proof)
        .replace("{status}", b.status.as_str())
        .replace("{status_options}", &status_options)
        .replace("{created_at}", &b.created_at.date().to_string())
        .replace("{special_requests}", &escape(&b.special_requests))
}

pub(crate) fn render_rows(all: &[BookingWithRoom], filter: &BookingFilter, today: Date) -> String {
    let shown: Vec<_> = all.iter().filter(|row| filter.matches(row, today)).collect();
    let pending = shown.iter().filter(|row| row.booking.status == BookingStatus::Pending).count();

    let mut html = format!(
        r#"<tr class="summary"><td colspan="9">{} of {} bookings, {pending} pending</td></tr>"#,
        shown.len(),
        all.len()
    );
    if shown.is_empty() {
        html += r#"<tr><td colspan="9" class="empty">No bookings match.</td></tr>"#;
    }
    for row in shown {
        html += &booking_row(row);
    }
    html
}

#[debug_handler(state = AppState)]
pub(crate) async fn dashboard(
    State(config): State<Arc<Config>>,
    Admin(user): Admin,
) -> Html<String> {
    let status_options: String = BookingStatus::ALL
        .iter()
        .map(|s| format!(r#"<option value="{s}">{s}</option>"#))
        .collect();

    let body = include_res!(str, "/pages/dashboard/dashboard.html")
        .replace("{status_options}", &status_options)
        .replace("{poll_ms}", &(config.dashboard_poll_seconds * 1000).to_string())
        .replace("{loading}", LOADING);

    Page { title: "Dashboard", site: &config.site, user: Some(&user), alert: None }.render(&body)
}

/// Table body for the current filters; the dashboard polls this and refetches on every change event.
#[debug_handler(state = AppState)]
pub(crate) async fn booking_rows(
    State(db_pool): State<SqlitePool>,
    Admin(_): Admin,
    Query(filter): Query<BookingFilter>,
) -> AppResult<Html<String>> {
    let all = bookings::list_all(&db_pool).await?;
    Ok(Html(render_rows(&all, &filter, OffsetDateTime::now_utc().date())))
}
