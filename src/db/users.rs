use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[cfg(test)]
    pub(crate) fn test(email: &str, role: Role) -> User {
        User {
            id: Uuid::now_v7().to_string(),
            email: email.to_owned(),
            password_hash: None,
            role,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

pub async fn get(db_pool: &SqlitePool, id: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn by_email(db_pool: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE email=?")
        .bind(email.to_lowercase())
        .fetch_optional(db_pool)
        .await
}

/// Inserts a user row. Returns `None` when the email is already taken.
pub async fn create(db_pool: &SqlitePool, email: &str, password_hash: Option<&str>, role: Role) -> sqlx::Result<Option<User>> {
    let uuid = Uuid::now_v7();
    sqlx::query_as("INSERT INTO users (id,email,password_hash,role,created_at) VALUES (?,?,?,?,?) ON CONFLICT(email) DO NOTHING RETURNING *")
        .bind(uuid.to_string())
        .bind(email.to_lowercase())
        .bind(password_hash)
        .bind(role)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(db_pool)
        .await
}

/// Fetches the row for `email`, creating it with `role` on first sight.
pub async fn ensure(db_pool: &SqlitePool, email: &str, role: Role) -> sqlx::Result<User> {
    if let Some(user) = by_email(db_pool, email).await? {
        return Ok(user);
    }

    match create(db_pool, email, None, role).await? {
        Some(user) => {
            tracing::info!(user_id = %user.id, role = ?user.role, "created user row for {}", user.email);
            Ok(user)
        }
        // lost a race with another sign-in
        None => by_email(db_pool, email).await?.ok_or(sqlx::Error::RowNotFound),
    }
}

pub async fn set_password(db_pool: &SqlitePool, id: &str, password_hash: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET password_hash=? WHERE id=?")
        .bind(password_hash)
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn ensure_creates_once() {
        let db_pool = test_pool().await;

        let first = ensure(&db_pool, "Guest@Example.com", Role::User).await.unwrap();
        assert_eq!(first.email, "guest@example.com");
        assert_eq!(first.role, Role::User);

        let again = ensure(&db_pool, "guest@example.com", Role::Admin).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.role, Role::User);

        assert_eq!(get(&db_pool, &first.id).await.unwrap().unwrap().email, "guest@example.com");
    }

    #[tokio::test]
    async fn duplicate_emails_are_refused() {
        let db_pool = test_pool().await;

        assert!(create(&db_pool, "boss@hotel.com", Some("hash"), Role::Admin).await.unwrap().is_some());
        assert!(create(&db_pool, "BOSS@hotel.com", Some("other"), Role::User).await.unwrap().is_none());

        let user = by_email(&db_pool, "boss@hotel.com").await.unwrap().unwrap();
        assert_eq!(user.password_hash.as_deref(), Some("hash"));
        assert!(user.is_admin());

        set_password(&db_pool, &user.id, "new").await.unwrap();
        let user = by_email(&db_pool, "boss@hotel.com").await.unwrap().unwrap();
        assert_eq!(user.password_hash.as_deref(), Some("new"));
    }
}
