//! # Dashboard Hub
//!
//! Fans dashboard events out to every connected WebSocket observer.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dashboard Hub                                    │
//! │                                                                         │
//! │  DashboardHook ──publish──► broadcast::Sender<DashboardEvent>          │
//! │                                      │                                  │
//! │                 ┌────────────────────┼────────────────────┐             │
//! │                 ▼                    ▼                    ▼             │
//! │          ┌────────────┐       ┌────────────┐       ┌────────────┐      │
//! │          │ observer 1 │       │ observer 2 │       │ observer 3 │      │
//! │          │ (browser)  │       │ (browser)  │       │ (browser)  │      │
//! │          └────────────┘       └────────────┘       └────────────┘      │
//! │                                                                         │
//! │  Handshake: GET /ws with a bearer token (header or ?token=)            │
//! │  Frames:    {"event": "<name>", "data": <payload>} as text             │
//! │  Lagging:   an observer that falls behind skips the missed frames      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::auth::{bearer_from_headers, AuthUser};
use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// Constants
// =============================================================================

/// Frames buffered per observer before it starts lagging.
const BROADCAST_CAPACITY: usize = 256;

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Hub
// =============================================================================

/// One frame pushed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardEvent {
    pub event: String,
    pub data: Value,
}

impl DashboardEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        DashboardEvent {
            event: event.into(),
            data,
        }
    }
}

/// Broadcast point shared by the hooks and every socket task.
#[derive(Debug, Clone)]
pub struct DashboardHub {
    tx: broadcast::Sender<DashboardEvent>,
}

impl Default for DashboardHub {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        DashboardHub { tx }
    }

    /// Sends an event to every current observer. Returns how many received it.
    pub fn publish(&self, event: DashboardEvent) -> usize {
        let name = event.event.clone();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(event = %name, receivers, "Published dashboard event");
                receivers
            }
            // No observers connected
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// =============================================================================
// Handshake
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct WsParams {
    token: Option<String>,
}

/// Observer authentication for the upgrade request. Runs before the upgrade
/// extractor so an unauthenticated client gets a plain 401.
pub struct ObserverAuth(pub AuthUser);

impl FromRequestParts<AppState> for ObserverAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let from_query = Query::<WsParams>::try_from_uri(&parts.uri)
            .map(|Query(params)| params.token)
            .unwrap_or_default();

        let token = bearer_from_headers(&parts.headers)
            .map(str::to_string)
            .or(from_query)
            .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))?;

        let user = AuthUser::from_claims(state.jwt.validate(&token)?)?;
        Ok(ObserverAuth(user))
    }
}

/// `GET /ws`
pub async fn ws_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
    ObserverAuth(user): ObserverAuth,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    info!(login = %user.login, "Dashboard observer connecting");
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, user))
}

// =============================================================================
// Connection Handling
// =============================================================================

async fn handle_socket(socket: WebSocket, hub: DashboardHub, user: AuthUser) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.subscribe();
    let login = user.login;

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(64);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Broadcast forwarding task
    let forward_tx = outgoing_tx.clone();
    let forward_login = login.clone();
    let broadcast_handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        if forward_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(login = %forward_login, skipped, "Dashboard observer lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Ping task
    let ping_tx = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(PING_INTERVAL);
        loop {
            ping_interval.tick().await;
            if ping_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                break;
            }
        }
    });

    // Observers only listen; anything they send besides control frames is ignored.
    loop {
        match receiver.next().await {
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!(login = %login, "Observer requested close");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(login = %login, ?e, "WebSocket error");
                break;
            }
            None => {
                info!(login = %login, "Observer disconnected");
                break;
            }
        }
    }

    ping_handle.abort();
    broadcast_handle.abort();
    outgoing_handle.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let hub = DashboardHub::new();
        assert_eq!(hub.publish(DashboardEvent::new("lotesActualizados", json!([]))), 0);

        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.observer_count(), 2);

        let sent = hub.publish(DashboardEvent::new("salidasxdia", json!([{"day": "2024-05-01", "total": 3}])));
        assert_eq!(sent, 2);

        let got = a.recv().await.unwrap();
        assert_eq!(got.event, "salidasxdia");
        assert_eq!(b.recv().await.unwrap(), got);
    }

    #[test]
    fn test_frame_shape() {
        let frame = serde_json::to_value(DashboardEvent::new(
            "stockStopActivated",
            json!({"time": "2024-05-01T08:00:00Z"}),
        ))
        .unwrap();
        assert_eq!(
            frame,
            json!({"event": "stockStopActivated", "data": {"time": "2024-05-01T08:00:00Z"}})
        );
    }
}
