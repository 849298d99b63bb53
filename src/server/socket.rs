//! WebSocket relay of file events to browser clients.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use super::app::AppState;
use crate::bus::{BusEvent, EventBus};
use crate::watcher::ChangeRecord;

/// Message sent to clients.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    event: &'static str,
    data: &'a ChangeRecord,
}

/// Encode a bus event for the wire. Only file events are relayed.
#[must_use]
pub fn wire_message(event: &BusEvent) -> Option<String> {
    let data = event.record()?;
    serde_json::to_string(&WireMessage {
        event: event.name(),
        data,
    })
    .ok()
}

/// Upgrade handler for `/ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| relay(socket, state.bus))
}

/// Relay bus events to one client until it goes away.
async fn relay(socket: WebSocket, bus: EventBus) {
    let mut events = bus.subscribe();
    bus.publish(BusEvent::Connected);

    let (mut sink, mut incoming) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Some(text) = wire_message(&event) else {
                        continue;
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Client fell behind, dropping events");
                }
                Err(RecvError::Closed) => break,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    bus.publish(BusEvent::Disconnected);
}
