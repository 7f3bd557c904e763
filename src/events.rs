use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change to the bookings table, pushed to open dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub kind: ChangeKind,
    pub booking_id: i64,
}

pub fn channel() -> broadcast::Sender<BookingEvent> {
    broadcast::channel(64).0
}

/// Nobody listening is fine.
pub fn publish(tx: &broadcast::Sender<BookingEvent>, kind: ChangeKind, booking_id: i64) {
    let receivers = tx.send(BookingEvent { kind, booking_id }).unwrap_or(0);
    tracing::debug!(?kind, booking_id, receivers, "booking change");
}
