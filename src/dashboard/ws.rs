use axum::{debug_handler, extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{events::BookingEvent, session::Admin};

#[debug_handler(state = crate::AppState)]
pub async fn dashboard_ws(
    State(tx): State<broadcast::Sender<BookingEvent>>,
    Admin(admin): Admin,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    tracing::debug!(admin = %admin.email, "dashboard subscribed to booking changes");
    ws.on_upgrade(move |stream| forward_changes(stream, tx.subscribe()))
}

async fn forward_changes(stream: WebSocket, mut rx: broadcast::Receiver<BookingEvent>) {
    let (mut sender, mut receiver) = stream.split();

    let mut broadcast_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                // the page refetches everything anyway, so skipped events don't matter
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // the browser never sends anything meaningful; wait for it to go away
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut broadcast_task => recv_task.abort(),
        _ = &mut recv_task => broadcast_task.abort(),
    };
}
