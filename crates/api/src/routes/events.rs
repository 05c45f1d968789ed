//! Live event stream

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use alerting::AlertManager;

use crate::SharedState;

const PONG: &str = r#"{"type":"pong"}"#;

/// Upgrade to a WebSocket that streams every delivered alert as JSON
pub async fn events_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> Response {
    let alerts = state.read().await.alerts.clone();
    ws.on_upgrade(move |socket| stream_events(socket, alerts))
}

async fn stream_events(mut socket: WebSocket, alerts: Arc<AlertManager>) {
    let mut events = alerts.subscribe();

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(record) => {
                    let text = match serde_json::to_string(&record) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode event: {}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Dropping slow event subscriber ({} events behind)", skipped);
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) if text.trim() == "ping" => {
                    if socket.send(Message::Text(PONG.to_string())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(other)) => debug!("Ignoring client message: {:?}", other),
            },
        }
    }

    drop(events);
    info!(
        "Event subscriber disconnected (total: {})",
        alerts.subscriber_count()
    );
}
