mod list;
mod room;

use axum::{routing::get, Router};

use crate::{db::rooms::Room, include_res, res::escape, AppState};

pub(crate) use list::featured;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::rooms))
        .route("/{id}", get(room::room))
}

pub(crate) fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

pub(crate) fn image_or_placeholder(room: &Room) -> String {
    if room.image_url.is_empty() {
        "/static/room-placeholder.svg".to_owned()
    } else {
        escape(&room.image_url)
    }
}

pub(crate) fn room_card(room: &Room) -> String {
    include_res!(str, "/pages/rooms/room_card.html")
        .replace("{id}", &room.id.to_string())
        .replace("{image_url}", &image_or_placeholder(room))
        .replace("{cost}", &money(room.cost))
        .replace("{occupancy}", &room.occupancy.to_string())
        .replace("{bed_type}", &escape(&room.bed_type))
        .replace("{view}", &escape(&room.view))
        .replace("{name}", &escape(&room.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cards_escape_room_text() {
        let room = Room {
            id: 4,
            name: "<Suite>".to_owned(),
            description: String::new(),
            cost: 99.5,
            size: String::new(),
            occupancy: 3,
            bed_type: "King".to_owned(),
            view: "Sea".to_owned(),
            amenities: String::new(),
            check_in_time: String::new(),
            check_out_time: String::new(),
            rules: String::new(),
            image_url: String::new(),
        };

        let card = room_card(&room);
        assert!(card.contains("&lt;Suite&gt;"));
        assert!(card.contains("$99.50"));
        assert!(card.contains("/rooms/4"));
        assert!(card.contains("room-placeholder.svg"));
    }
}
