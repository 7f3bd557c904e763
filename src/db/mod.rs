pub mod bookings;
pub mod messages;
pub mod rooms;
pub mod users;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    // every connection to :memory: opens its own empty database
    let max_connections = if database_url.contains(":memory:") { 1 } else { 16 };

    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!().run(&db_pool).await?;
    tracing::info!("database ready at {database_url}");

    Ok(db_pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    connect("sqlite::memory:").await.unwrap()
}
