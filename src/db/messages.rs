use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMessage {
    #[validate(length(min = 1, message = "please tell us your name"))]
    pub name: String,
    #[validate(email(message = "that email address doesn't look right"))]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[validate(length(min = 1, message = "a subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000, message = "the message can't be empty"))]
    pub message: String,
}

pub async fn insert(db_pool: &SqlitePool, msg: &NewMessage) -> sqlx::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO contact_messages (name,email,phone,subject,message,created_at) VALUES (?,?,?,?,?,?) RETURNING id",
    )
    .bind(&msg.name)
    .bind(&msg.email)
    .bind(&msg.phone)
    .bind(&msg.subject)
    .bind(&msg.message)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(db_pool)
    .await?;

    Ok(id)
}

/// Newest first.
pub async fn list(db_pool: &SqlitePool) -> sqlx::Result<Vec<ContactMessage>> {
    sqlx::query_as("SELECT * FROM contact_messages ORDER BY created_at DESC, id DESC")
        .fetch_all(db_pool)
        .await
}

pub async fn delete(db_pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM contact_messages WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
