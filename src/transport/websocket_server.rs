use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{
    common::types::SessionKey,
    protocol::{NoticeEnvelope, SessionNotice},
    server::{AppState, SessionHandle},
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// GET /v1/sessions/{key}/events
///
/// Streams the session's notices as JSON text frames. Subscribing starts the
/// session if it does not exist yet.
pub async fn events_handler(
    Path(key): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let key = SessionKey::from(key);
    let session = state.sessions.get_or_create(&key);
    ws.on_upgrade(move |socket| handle_socket(socket, key, session))
}

async fn handle_socket(mut socket: WebSocket, key: SessionKey, session: SessionHandle) {
    let subscriber = uuid::Uuid::new_v4();
    let mut notices = session.subscribe();
    info!("[{}] Event subscriber {} connected", key, subscriber);

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            notice = notices.recv() => {
                let notice = match notice {
                    Ok(notice) => notice,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("[{}] Subscriber {} lagged, {} notices dropped", key, subscriber, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let closed = matches!(notice, SessionNotice::Closed);
                let envelope = NoticeEnvelope { session: &key, notice: &notice };
                match serde_json::to_string(&envelope) {
                    Ok(json) => {
                        if let Err(e) = socket.send(Message::Text(json.into())).await {
                            debug!("[{}] Socket send error for {}: {}", key, subscriber, e);
                            break;
                        }
                    }
                    Err(e) => warn!("[{}] Failed to encode notice: {}", key, e),
                }
                if closed {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("[{}] WebSocket error for {}: {}", key, subscriber, e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("[{}] Event subscriber {} disconnected", key, subscriber);
}
