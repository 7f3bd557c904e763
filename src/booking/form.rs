use std::{collections::BTreeSet, sync::Arc};

use axum::{
    debug_handler,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use time::{Date, OffsetDateTime};
use tokio::sync::broadcast;
use validator::Validate;

use crate::{
    config::Config,
    db::{
        bookings::{self, NewBooking},
        rooms::{self, Room},
        users::User,
    },
    events::{self, BookingEvent, ChangeKind},
    form::{validation_message, MultipartForm},
    include_res,
    mail::{Mailer, Template},
    res::{escape, Page},
    rooms::money,
    session::SignedIn,
    storage::{Bucket, Storage},
    AppError, AppResult, AppState,
};

use super::availability::{first_conflict, parse_date, total_cost, unavailable_dates};

#[derive(Debug, Validate)]
pub(crate) struct BookingRequest {
    pub(crate) room_id: i64,
    #[validate(length(min = 1, message = "please enter your name"))]
    pub(crate) guest_name: String,
    #[validate(email(message = "please enter a valid email address"))]
    pub(crate) guest_email: String,
    #[validate(length(min = 5, max = 30, message = "please enter a phone number"))]
    pub(crate) guest_phone: String,
    pub(crate) check_in: Date,
    pub(crate) check_out: Date,
    #[validate(range(min = 1, message = "at least one guest is required"))]
    pub(crate) guests: i64,
    #[validate(length(max = 2000, message = "special requests are limited to 2000 characters"))]
    pub(crate) special_requests: String,
}

impl BookingRequest {
    /// The booking is always filed under the signed-in account's email.
    pub(crate) fn from_form(form: &MultipartForm, email: &str) -> Result<BookingRequest, String> {
        let date = |name: &str, label: &str| parse_date(&form.text(name)).ok_or(format!("please pick a {label} date"));

        Ok(BookingRequest {
            room_id: form.parse("room_id", "room").map_err(|_| "please pick a room".to_owned())?,
            guest_name: form.text("guest_name"),
            guest_email: email.to_lowercase(),
            guest_phone: form.text("guest_phone"),
            check_in: date("check_in", "check-in")?,
            check_out: date("check_out", "check-out")?,
            guests: form.parse("guests", "guests").map_err(|_| "please enter the number of guests".to_owned())?,
            special_requests: form.text("special_requests"),
        })
    }

    /// Everything a user can fix on the form.
    pub(crate) fn check(&self, room: &Room, taken: &BTreeSet<Date>, today: Date) -> Result<(), String> {
        self.validate().map_err(|errors| validation_message(&errors))?;

        if self.check_in < today {
            return Err("check-in can't be in the past".to_owned());
        }
        if self.check_out <= self.check_in {
            return Err("check-out must be after check-in".to_owned());
        }
        if self.guests > room.occupancy {
            return Err(format!("{} sleeps at most {} guests", room.name, room.occupancy));
        }
        if let Some(night) = first_conflict(taken, self.check_in, self.check_out) {
            return Err(format!("{} is already booked on {night}", room.name));
        }

        Ok(())
    }
}

#[derive(Deserialize)]
pub(crate) struct BookingQuery {
    room_id: Option<i64>,
}

struct Draft<'a> {
    form: Option<&'a MultipartForm>,
    user: &'a User,
}

impl Draft<'_> {
    fn value(&self, name: &str) -> String {
        match self.form {
            _ if name == "guest_email" => escape(&self.user.email),
            Some(form) => escape(&form.text(name)),
            None if name == "guests" => "1".to_owned(),
            None => String::new(),
        }
    }
}

async fn taken_dates(db_pool: &SqlitePool, room_id: i64) -> AppResult<BTreeSet<Date>> {
    Ok(unavailable_dates(&bookings::for_room(db_pool, room_id).await?))
}

fn taken_list(taken: &BTreeSet<Date>) -> String {
    if taken.is_empty() {
        return "<li>Every night is open.</li>".to_owned();
    }
    taken.iter().map(|d| format!("<li>{d}</li>")).collect()
}

async fn booking_form(
    db_pool: &SqlitePool,
    config: &Config,
    user: &User,
    selected: Option<i64>,
    draft: Option<&MultipartForm>,
    alert: Option<&str>,
) -> AppResult<Html<String>> {
    let all = rooms::list(db_pool).await?;
    let selected = selected.or(all.first().map(|r| r.id));

    let room_options: String = all
        .iter()
        .map(|room| {
            format!(
                r#"<option value="{}" data-occupancy="{}"{}>{} ({} / night)</option>"#,
                room.id,
                room.occupancy,
                if Some(room.id) == selected { " selected" } else { "" },
                escape(&room.name),
                money(room.cost)
            )
        })
        .collect();

    let taken = match selected {
        Some(room_id) => taken_dates(db_pool, room_id).await?,
        None => BTreeSet::new(),
    };

    let draft = Draft { form: draft, user };
    let mut body = include_res!(str, "/pages/booking/booking.html")
        .replace("{room_options}", &room_options)
        .replace("{unavailable}", &taken_list(&taken));
    for name in ["guest_name", "guest_email", "guest_phone", "check_in", "check_out", "guests", "special_requests"] {
        body = body.replace(&format!("{{{name}}}"), &draft.value(name));
    }

    Ok(Page { title: "Book a room", site: &config.site, user: Some(user), alert }.render(&body))
}

#[debug_handler(state = AppState)]
pub(crate) async fn booking_page(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    SignedIn(user): SignedIn,
    Query(BookingQuery { room_id }): Query<BookingQuery>,
) -> AppResult<Html<String>> {
    booking_form(&db_pool, &config, &user, room_id, None, None).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn unavailable(
    State(db_pool): State<SqlitePool>,
    Path(room_id): Path<i64>,
) -> AppResult<Json<Vec<String>>> {
    let taken = taken_dates(&db_pool, room_id).await?;
    Ok(Json(taken.iter().map(Date::to_string).collect()))
}

async fn rejected(
    db_pool: &SqlitePool,
    config: &Config,
    user: &User,
    form: &MultipartForm,
    room_id: Option<i64>,
    message: String,
) -> AppResult<Response> {
    tracing::debug!("booking form rejected: {message}");
    let page = booking_form(db_pool, config, user, room_id, Some(form), Some(&message)).await?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn submit_booking(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(storage): State<Storage>,
    State(mailer): State<Mailer>,
    State(tx): State<broadcast::Sender<BookingEvent>>,
    SignedIn(user): SignedIn,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = MultipartForm::read(multipart).await?;

    let request = match BookingRequest::from_form(&form, &user.email) {
        Ok(request) => request,
        Err(message) => {
            let room_id = form.parse("room_id", "room").ok();
            return rejected(&db_pool, &config, &user, &form, room_id, message).await;
        }
    };

    let Some(room) = rooms::get(&db_pool, request.room_id).await? else {
        return rejected(&db_pool, &config, &user, &form, None, "that room is no longer available".to_owned()).await;
    };

    let taken = taken_dates(&db_pool, room.id).await?;
    if let Err(message) = request.check(&room, &taken, OffsetDateTime::now_utc().date()) {
        return rejected(&db_pool, &config, &user, &form, Some(room.id), message).await;
    }

    let Some(proof) = form.take_file("payment_proof") else {
        return rejected(&db_pool, &config, &user, &form, Some(room.id), "please attach your payment proof".to_owned()).await;
    };
    let payment_proof_url = match storage.save(Bucket::PaymentProofs, &proof.file_name, &proof.bytes).await {
        Ok(url) => url,
        Err(AppError::Status(_, message)) => return rejected(&db_pool, &config, &user, &form, Some(room.id), message).await,
        Err(e) => return Err(e),
    };

    let booking = NewBooking {
        room_id: room.id,
        guest_name: request.guest_name,
        guest_email: request.guest_email,
        guest_phone: request.guest_phone,
        check_in: request.check_in,
        check_out: request.check_out,
        guests: request.guests,
        special_requests: request.special_requests,
        total_cost: total_cost(room.cost, request.check_in, request.check_out),
        payment_proof_url: Some(payment_proof_url),
    };
    let booking_id = bookings::insert(&db_pool, &booking).await?;
    tracing::info!(booking_id, room_id = room.id, "new booking from {}", booking.guest_email);

    events::publish(&tx, ChangeKind::Insert, booking_id);
    mailer.send_later(
        Template::BookingReceived,
        json!({
            "booking_id": booking_id,
            "guest_name": booking.guest_name,
            "to_email": booking.guest_email,
            "room_name": room.name,
            "check_in": booking.check_in.to_string(),
            "check_out": booking.check_out.to_string(),
            "guests": booking.guests,
            "total_cost": money(booking.total_cost),
        }),
    );

    let body = include_res!(str, "/pages/booking/booked.html")
        .replace("{guest_name}", &escape(&booking.guest_name))
        .replace("{room_name}", &escape(&room.name))
        .replace("{check_in}", &booking.check_in.to_string())
        .replace("{check_out}", &booking.check_out.to_string())
        .replace("{total_cost}", &money(booking.total_cost));

    let page = Page { title: "Booking received", site: &config.site, user: Some(&user), alert: None };
    Ok(page.render(&body).into_response())
}
