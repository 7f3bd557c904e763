use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub cost: f64,
    pub size: String,
    pub occupancy: i64,
    pub bed_type: String,
    pub view: String,
    pub amenities: String,
    pub check_in_time: String,
    pub check_out_time: String,
    pub rules: String,
    pub image_url: String,
}

impl Room {
    pub fn amenities(&self) -> Vec<&str> {
        self.amenities
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RoomForm {
    #[validate(length(min = 1, message = "room name is required"))]
    pub name: String,
    pub description: String,
    #[validate(range(min = 0.0, message = "cost can't be negative"))]
    pub cost: f64,
    pub size: String,
    #[validate(range(min = 1, max = 20, message = "occupancy must be between 1 and 20"))]
    pub occupancy: i64,
    pub bed_type: String,
    pub view: String,
    pub amenities: String,
    pub check_in_time: String,
    pub check_out_time: String,
    pub rules: String,
    pub image_url: String,
}

impl From<Room> for RoomForm {
    fn from(room: Room) -> Self {
        RoomForm {
            name: room.name,
            description: room.description,
            cost: room.cost,
            size: room.size,
            occupancy: room.occupancy,
            bed_type: room.bed_type,
            view: room.view,
            amenities: room.amenities,
            check_in_time: room.check_in_time,
            check_out_time: room.check_out_time,
            rules: room.rules,
            image_url: room.image_url,
        }
    }
}

pub async fn list(db_pool: &SqlitePool) -> sqlx::Result<Vec<Room>> {
    sqlx::query_as("SELECT * FROM rooms ORDER BY cost, id")
        .fetch_all(db_pool)
        .await
}

pub async fn get(db_pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Room>> {
    sqlx::query_as("SELECT * FROM rooms WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn insert(db_pool: &SqlitePool, room: &RoomForm) -> sqlx::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO rooms (name,description,cost,size,occupancy,bed_type,view,amenities,check_in_time,check_out_time,rules,image_url)
        VALUES (?,?,?,?,?,?,?,?,?,?,?,?) RETURNING id",
    )
    .bind(&room.name)
    .bind(&room.description)
    .bind(room.cost)
    .bind(&room.size)
    .bind(room.occupancy)
    .bind(&room.bed_type)
    .bind(&room.view)
    .bind(&room.amenities)
    .bind(&room.check_in_time)
    .bind(&room.check_out_time)
    .bind(&room.rules)
    .bind(&room.image_url)
    .fetch_one(db_pool)
    .await?;

    Ok(id)
}

pub async fn update(db_pool: &SqlitePool, id: i64, room: &RoomForm) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE rooms SET name=?,description=?,cost=?,size=?,occupancy=?,bed_type=?,view=?,amenities=?,check_in_time=?,check_out_time=?,rules=?,image_url=?
        WHERE id=?",
    )
    .bind(&room.name)
    .bind(&room.description)
    .bind(room.cost)
    .bind(&room.size)
    .bind(room.occupancy)
    .bind(&room.bed_type)
    .bind(&room.view)
    .bind(&room.amenities)
    .bind(&room.check_in_time)
    .bind(&room.check_out_time)
    .bind(&room.rules)
    .bind(&room.image_url)
    .bind(id)
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(db_pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM rooms WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) fn sample(name: &str, cost: f64, occupancy: i64) -> RoomForm {
    RoomForm {
        name: name.to_owned(),
        description: "A quiet room.".to_owned(),
        cost,
        size: "30 m²".to_owned(),
        occupancy,
        bed_type: "Queen".to_owned(),
        view: "Garden".to_owned(),
        amenities: "WiFi, Minibar".to_owned(),
        check_in_time: "14:00".to_owned(),
        check_out_time: "11:00".to_owned(),
        rules: "- no smoking".to_owned(),
        image_url: String::new(),
    }
}
