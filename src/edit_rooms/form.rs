use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    db::{rooms::{self, Room, RoomForm}, users::User},
    form::{validation_message, MultipartForm},
    include_res,
    res::{escape, Page},
    rooms::money,
    session::Admin,
    storage::{Bucket, Storage},
    AppError, AppResult, AppState,
};

const TEXT_FIELDS: [&str; 10] = [
    "name", "description", "size", "bed_type", "view", "amenities", "check_in_time", "check_out_time", "rules", "image_url",
];

fn parse_room(form: &MultipartForm) -> Result<RoomForm, String> {
    let room = RoomForm {
        name: form.text("name"),
        description: form.text("description"),
        // f64 parsing takes "NaN" and "inf", which the range check lets through
        cost: form
            .parse::<f64>("cost", "cost")
            .ok()
            .filter(|cost| cost.is_finite())
            .ok_or_else(|| "cost must be a number".to_owned())?,
        size: form.text("size"),
        occupancy: form.parse("occupancy", "occupancy").map_err(|_| "occupancy must be a whole number".to_owned())?,
        bed_type: form.text("bed_type"),
        view: form.text("view"),
        amenities: form.text("amenities"),
        check_in_time: form.text("check_in_time"),
        check_out_time: form.text("check_out_time"),
        rules: form.text("rules"),
        image_url: form.text("image_url"),
    };
    room.validate().map_err(|errors| validation_message(&errors))?;
    Ok(room)
}

fn room_editor(action: &str, submit: &str, room: &RoomForm) -> String {
    let mut html = include_res!(str, "/pages/edit_rooms/room_form.html")
        .replace("{action}", action)
        .replace("{submit}", submit)
        .replace("{cost}", &room.cost.to_string())
        .replace("{occupancy}", &room.occupancy.to_string());

    let values = [
        &room.name, &room.description, &room.size, &room.bed_type, &room.view, &room.amenities,
        &room.check_in_time, &room.check_out_time, &room.rules, &room.image_url,
    ];
    for (name, value) in TEXT_FIELDS.iter().zip(values) {
        html = html.replace(&format!("{{{name}}}"), &escape(value));
    }
    html
}

fn room_row(room: &Room) -> String {
    include_res!(str, "/pages/edit_rooms/room_row.html")
        .replace("{id}", &room.id.to_string())
        .replace("{cost}", &money(room.cost))
        .replace("{occupancy}", &room.occupancy.to_string())
        .replace("{name}", &escape(&room.name))
}

fn blank_room() -> RoomForm {
    RoomForm {
        occupancy: 2,
        check_in_time: "14:00".to_owned(),
        check_out_time: "11:00".to_owned(),
        ..RoomForm::default()
    }
}

async fn list_page(
    db_pool: &SqlitePool,
    config: &Config,
    user: &User,
    draft: &RoomForm,
    alert: Option<&str>,
) -> AppResult<Response> {
    let all = rooms::list(db_pool).await?;
    let room_rows: String = all.iter().map(room_row).collect();

    let body = include_res!(str, "/pages/edit_rooms/edit_rooms.html")
        .replace("{room_rows}", &room_rows)
        .replace("{room_form}", &room_editor("/edit-rooms", "Add room", draft));

    let page = Page { title: "Edit Rooms", site: &config.site, user: Some(user), alert }.render(&body);
    Ok(match alert {
        Some(_) => (StatusCode::BAD_REQUEST, page).into_response(),
        None => page.into_response(),
    })
}

fn edit_form_page(config: &Config, user: &User, id: i64, room: &RoomForm, alert: Option<&str>) -> Response {
    let body = include_res!(str, "/pages/edit_rooms/edit_room.html")
        .replace("{id}", &id.to_string())
        .replace("{name}", &escape(&room.name))
        .replace("{room_form}", &room_editor(&format!("/edit-rooms/{id}"), "Save changes", room));

    let page = Page { title: "Edit room", site: &config.site, user: Some(user), alert }.render(&body);
    match alert {
        Some(_) => (StatusCode::BAD_REQUEST, page).into_response(),
        None => page.into_response(),
    }
}

/// Replaces `image_url` with the uploaded image, when one was picked.
async fn attach_image(storage: &Storage, form: &mut MultipartForm, room: &mut RoomForm) -> Result<(), AppError> {
    if let Some(image) = form.take_file("image") {
        room.image_url = storage.save(Bucket::RoomImages, &image.file_name, &image.bytes).await?;
    }
    Ok(())
}

fn draft_of(form: &MultipartForm) -> RoomForm {
    RoomForm {
        name: form.text("name"),
        description: form.text("description"),
        cost: form.parse("cost", "cost").unwrap_or_default(),
        size: form.text("size"),
        occupancy: form.parse("occupancy", "occupancy").unwrap_or(2),
        bed_type: form.text("bed_type"),
        view: form.text("view"),
        amenities: form.text("amenities"),
        check_in_time: form.text("check_in_time"),
        check_out_time: form.text("check_out_time"),
        rules: form.text("rules"),
        image_url: form.text("image_url"),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn room_list(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Admin(user): Admin,
) -> AppResult<Response> {
    list_page(&db_pool, &config, &user, &blank_room(), None).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_room(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(storage): State<Storage>,
    Admin(user): Admin,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let mut room = match parse_room(&form) {
        Ok(room) => room,
        Err(message) => return list_page(&db_pool, &config, &user, &draft_of(&form), Some(&message)).await,
    };

    match attach_image(&storage, &mut form, &mut room).await {
        Ok(()) => {}
        Err(AppError::Status(_, message)) => return list_page(&db_pool, &config, &user, &room, Some(&message)).await,
        Err(e) => return Err(e),
    }

    let id = rooms::insert(&db_pool, &room).await?;
    tracing::info!(room_id = id, admin = %user.email, "room added: {}", room.name);
    Ok(Redirect::to("/edit-rooms").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit_page(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Admin(user): Admin,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let Some(room) = rooms::get(&db_pool, id).await? else {
        return Err(AppError::not_found("room"));
    };
    Ok(edit_form_page(&config, &user, id, &RoomForm::from(room), None))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_room(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(storage): State<Storage>,
    Admin(user): Admin,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let mut room = match parse_room(&form) {
        Ok(room) => room,
        Err(message) => return Ok(edit_form_page(&config, &user, id, &draft_of(&form), Some(&message))),
    };

    match attach_image(&storage, &mut form, &mut room).await {
        Ok(()) => {}
        Err(AppError::Status(_, message)) => return Ok(edit_form_page(&config, &user, id, &room, Some(&message))),
        Err(e) => return Err(e),
    }

    if !rooms::update(&db_pool, id, &room).await? {
        return Err(AppError::not_found("room"));
    }
    tracing::info!(room_id = id, admin = %user.email, "room updated");
    Ok(Redirect::to("/edit-rooms").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_room(
    State(db_pool): State<SqlitePool>,
    Admin(user): Admin,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    if !rooms::delete(&db_pool, id).await? {
        return Err(AppError::not_found("room"));
    }
    tracing::info!(room_id = id, admin = %user.email, "room deleted");
    Ok(Redirect::to("/edit-rooms"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(cost: &str, occupancy: &str) -> MultipartForm {
        MultipartForm::with_fields(&[
            ("name", "Loft"),
            ("description", "Under the *roof*."),
            ("cost", cost),
            ("occupancy", occupancy),
            ("amenities", "WiFi, Desk"),
        ])
    }

    #[test]
    fn parses_room_fields() {
        let room = parse_room(&filled("89.90", "2")).unwrap();
        assert_eq!(room.name, "Loft");
        assert_eq!(room.cost, 89.9);
        assert_eq!(room.occupancy, 2);
    }

    #[test]
    fn reports_bad_numbers() {
        assert_eq!(parse_room(&filled("cheap", "2")).unwrap_err(), "cost must be a number");
        assert_eq!(parse_room(&filled("NaN", "2")).unwrap_err(), "cost must be a number");
        assert_eq!(parse_room(&filled("inf", "2")).unwrap_err(), "cost must be a number");
        assert_eq!(parse_room(&filled("50", "two")).unwrap_err(), "occupancy must be a whole number");
        assert_eq!(parse_room(&filled("50", "0")).unwrap_err(), "occupancy must be between 1 and 20");
    }

    #[test]
    fn editor_prefills_escaped_values() {
        let mut room = blank_room();
        room.name = r#"The "Nest""#.to_owned();
        let html = room_editor("/edit-rooms/3", "Save changes", &room);

        assert!(html.contains("The &quot;Nest&quot;"));
        assert!(html.contains(r#"action="/edit-rooms/3""#));
        assert!(html.contains("14:00"));
    }
}
