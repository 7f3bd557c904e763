use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled];

    pub fn as_str(&self) -> &'static str {
        use BookingStatus::*;
        match self {
            Pending => "pending",
            Confirmed => "confirmed",
            Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown booking status {s:?}"))
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub room_id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub check_in: Date,
    pub check_out: Date,
    pub guests: i64,
    pub special_requests: String,
    pub status: BookingStatus,
    pub total_cost: f64,
    pub payment_proof_url: Option<String>,
    pub created_at: OffsetDateTime,
}

/// A booking joined with the name of its room, which may have been deleted since.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingWithRoom {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub room_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub check_in: Date,
    pub check_out: Date,
    pub guests: i64,
    pub special_requests: String,
    pub total_cost: f64,
    pub payment_proof_url: Option<String>,
}

const WITH_ROOM: &str = "SELECT b.*, r.name AS room_name FROM bookings b LEFT JOIN rooms r ON r.id = b.room_id";

pub async fn insert(db_pool: &SqlitePool, booking: &NewBooking) -> sqlx::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO bookings (room_id,guest_name,guest_email,guest_phone,check_in,check_out,guests,special_requests,status,total_cost,payment_proof_url,created_at)
        VALUES (?,?,?,?,?,?,?,?,?,?,?,?) RETURNING id",
    )
    .bind(booking.room_id)
    .bind(&booking.guest_name)
    .bind(&booking.guest_email)
    .bind(&booking.guest_phone)
    .bind(booking.check_in)
    .bind(booking.check_out)
    .bind(booking.guests)
    .bind(&booking.special_requests)
    .bind(BookingStatus::Pending)
    .bind(booking.total_cost)
    .bind(&booking.payment_proof_url)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(db_pool)
    .await?;

    Ok(id)
}

pub async fn get(db_pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Booking>> {
    sqlx::query_as("SELECT * FROM bookings WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

/// Every booking, newest first.
pub async fn list_all(db_pool: &SqlitePool) -> sqlx::Result<Vec<BookingWithRoom>> {
    sqlx::query_as(&format!("{WITH_ROOM} ORDER BY b.created_at DESC, b.id DESC"))
        .fetch_all(db_pool)
        .await
}

pub async fn for_email(db_pool: &SqlitePool, email: &str) -> sqlx::Result<Vec<BookingWithRoom>> {
    sqlx::query_as(&format!("{WITH_ROOM} WHERE lower(b.guest_email)=lower(?) ORDER BY b.check_in DESC, b.id DESC"))
        .bind(email)
        .fetch_all(db_pool)
        .await
}

pub async fn for_room(db_pool: &SqlitePool, room_id: i64) -> sqlx::Result<Vec<Booking>> {
    sqlx::query_as("SELECT * FROM bookings WHERE room_id=? AND status<>'cancelled'")
        .bind(room_id)
        .fetch_all(db_pool)
        .await
}

pub async fn set_status(db_pool: &SqlitePool, id: i64, status: BookingStatus) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE bookings SET status=? WHERE id=?")
        .bind(status)
        .bind(id)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(db_pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM bookings WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) fn sample(room_id: i64, email: &str, check_in: Date, check_out: Date) -> NewBooking {
    NewBooking {
        room_id,
        guest_name: "Ada Lovelace".to_owned(),
        guest_email: email.to_owned(),
        guest_phone: "555-0199".to_owned(),
        check_in,
        check_out,
        guests: 2,
        special_requests: String::new(),
        total_cost: 240.0,
        payment_proof_url: None,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::db::{rooms, test_pool};

    #[test]
    fn status_names() {
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert!("lost".parse::<BookingStatus>().is_err());
        assert_eq!(BookingStatus::Cancelled.to_string(), "cancelled");
    }

    #[tokio::test]
    async fn bookings_are_listed_with_room_names() {
        let db_pool = test_pool().await;
        let room_id = rooms::insert(&db_pool, &rooms::sample("Deluxe", 120.0, 2)).await.unwrap();

        let first = insert(&db_pool, &sample(room_id, "ada@example.com", date!(2025 - 06 - 01), date!(2025 - 06 - 03)))
            .await
            .unwrap();
        let second = insert(&db_pool, &sample(room_id, "bob@example.com", date!(2025 - 07 - 01), date!(2025 - 07 - 02)))
            .await
            .unwrap();

        let all = list_all(&db_pool).await.unwrap();
        assert_eq!(all.iter().map(|b| b.booking.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(all[0].room_name.as_deref(), Some("Deluxe"));
        assert_eq!(all[0].booking.status, BookingStatus::Pending);

        let mine = for_email(&db_pool, "ADA@example.com").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].booking.check_in, date!(2025 - 06 - 01));
    }

    #[tokio::test]
    async fn cancelled_bookings_leave_the_room_calendar() {
        let db_pool = test_pool().await;
        let id = insert(&db_pool, &sample(7, "ada@example.com", date!(2025 - 06 - 01), date!(2025 - 06 - 03)))
            .await
            .unwrap();
        assert_eq!(for_room(&db_pool, 7).await.unwrap().len(), 1);

        assert!(set_status(&db_pool, id, BookingStatus::Cancelled).await.unwrap());
        assert!(for_room(&db_pool, 7).await.unwrap().is_empty());
        assert_eq!(get(&db_pool, id).await.unwrap().unwrap().status, BookingStatus::Cancelled);

        assert!(delete(&db_pool, id).await.unwrap());
        assert!(get(&db_pool, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_rooms_leave_bookings_without_a_name() {
        let db_pool = test_pool().await;
        let room_id = rooms::insert(&db_pool, &rooms::sample("Attic", 60.0, 1)).await.unwrap();
        insert(&db_pool, &sample(room_id, "ada@example.com", date!(2025 - 06 - 01), date!(2025 - 06 - 02)))
            .await
            .unwrap();
        rooms::delete(&db_pool, room_id).await.unwrap();

        let all = list_all(&db_pool).await.unwrap();
        assert_eq!(all[0].room_name, None);
    }
}
