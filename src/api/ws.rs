// WebSocket Stream Subscribers
//
// Each connection is one subscription to one view. A single select loop per
// connection forwards queued payloads, answers application-level pings, and
// enforces the liveness timeout. Detach happens implicitly when the
// subscription receiver drops.

use crate::ct::record::StreamView;
use crate::stream::broker::FanOutBroker;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Minimum spacing between lag warnings for one subscriber
const DROP_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Close reason sent when an endpoint is at its client cap
const MAX_CLIENTS_REASON: &str = "Max clients reached";

/// Close reason sent on liveness timeout
const PING_TIMEOUT_REASON: &str = "ping timeout";

/// Server reply to an application-level ping
const PONG_MESSAGE: &str = r#"{"message_type":"pong"}"#;

/// One WebSocket listener's state: the broker plus the view it serves
pub struct WsEndpoint {
    pub broker: Arc<FanOutBroker>,
    pub view: StreamView,
    pub ping_timeout: Duration,
}

/// Handle a WebSocket upgrade on a stream endpoint
pub async fn stream_handler(
    State(endpoint): State<Arc<WsEndpoint>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, endpoint))
}

/// Drive one subscriber connection until it closes
async fn serve_subscriber(mut socket: WebSocket, endpoint: Arc<WsEndpoint>) {
    let mut updates = match endpoint.broker.attach(endpoint.view) {
        Ok(receiver) => receiver,
        Err(_) => {
            debug!("Refusing subscriber on {} stream: at client cap", endpoint.view);
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::NORMAL,
                    reason: Cow::from(MAX_CLIENTS_REASON),
                })))
                .await;
            return;
        }
    };

    info!("Subscriber connected to {} stream", endpoint.view);

    let (mut sender, mut receiver) = socket.split();
    let mut last_ping = Instant::now();
    let mut last_drop_warn: Option<Instant> = None;
    let mut liveness = tokio::time::interval(endpoint.ping_timeout);
    liveness.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(payload) => {
                    if sender.send(Message::Text((*payload).clone())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    endpoint.broker.note_dropped(n);
                    let now = Instant::now();
                    if last_drop_warn.map_or(true, |t| now.duration_since(t) >= DROP_WARN_INTERVAL) {
                        warn!(
                            "Subscriber on {} stream lagging: {} messages dropped ({} total across subscribers)",
                            endpoint.view,
                            n,
                            endpoint.broker.dropped_total()
                        );
                        last_drop_warn = Some(now);
                    } else {
                        debug!("Subscriber on {} stream dropped {} messages", endpoint.view, n);
                    }
                }
                Err(RecvError::Closed) => break,
            },

            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if is_ping(&text) {
                        last_ping = Instant::now();
                        if sender.send(Message::Text(PONG_MESSAGE.to_string())).await.is_err() {
                            break;
                        }
                    }
                    // Other messages are ignored
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary and transport ping/pong frames ignored
                Some(Err(e)) => {
                    debug!("Subscriber socket error on {} stream: {}", endpoint.view, e);
                    break;
                }
            },

            _ = liveness.tick() => {
                if last_ping.elapsed() > endpoint.ping_timeout {
                    debug!("Closing idle subscriber on {} stream", endpoint.view);
                    let _ = sender
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: Cow::from(PING_TIMEOUT_REASON),
                        })))
                        .await;
                    break;
                }
            }
        }
    }

    info!("Subscriber disconnected from {} stream", endpoint.view);
}

/// True for a `{"message_type": "ping"}` client frame
fn is_ping(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|value| value["message_type"] == "ping")
        .unwrap_or(false)
}
