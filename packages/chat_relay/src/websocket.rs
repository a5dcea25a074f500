use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::hub::HubHandle;
use crate::metrics::ServerMetrics;
use crate::protocol::{ClientMessage, ConnectionId, OutboundNotification};

/// Upgrade `GET /ws` into a relay connection.
pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!("WebSocket upgrade rejected: {}", rejection);
            return rejection.into_response();
        }
    };

    ws.on_failed_upgrade(|e| warn!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_connection(socket, state.hub, state.metrics))
}

/// Register an upgraded socket with the hub and run it until its read side ends.
pub async fn handle_connection(socket: WebSocket, hub: HubHandle, metrics: Arc<ServerMetrics>) {
    let conn = ConnectionId::next();
    metrics.connection_opened();
    info!(conn_id = %conn, "Client connected to endpoint");

    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<OutboundNotification>();

    // Queued before registration so it precedes any fan-out.
    let _ = tx.send(OutboundNotification::connected());

    if let Err(e) = hub.register(conn, tx).await {
        warn!(conn_id = %conn, "Dropping connection: {}", e);
        metrics.connection_closed();
        return;
    }

    tokio::spawn(write_loop(conn, ws_sender, rx));

    run_supervised(
        conn,
        read_loop(conn, ws_receiver, hub.clone(), metrics.clone()),
        &metrics,
    )
    .await;

    if hub.disconnect(conn).await.is_err() {
        debug!(conn_id = %conn, "Hub already stopped, skipping deregistration");
    }
    metrics.connection_closed();
    info!(conn_id = %conn, "Client disconnected");
}

/// Decode client frames and forward them to the hub until the stream ends.
pub(crate) async fn read_loop<S>(
    conn: ConnectionId,
    mut stream: S,
    hub: HubHandle,
    metrics: Arc<ServerMetrics>,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                debug!(conn_id = %conn, "Close frame received");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                debug!(conn_id = %conn, "Read error: {}", e);
                break;
            }
        };

        let message = match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(message) => message,
            Err(e) => {
                metrics.decode_failed();
                debug!(conn_id = %conn, "Discarding undecodable frame: {}", e);
                continue;
            }
        };

        metrics.event_received();
        if hub.submit(message.into_event(conn)).await.is_err() {
            warn!(conn_id = %conn, "Hub stopped, ending reader");
            break;
        }
    }
}

/// Drain the connection's outbound queue into the socket.
///
/// Returns when a write fails (dropping the queue, so the hub's next send to
/// this connection fails) or when the hub drops the sender.
pub(crate) async fn write_loop<W>(
    conn: ConnectionId,
    mut sink: W,
    mut outbound: mpsc::UnboundedReceiver<OutboundNotification>,
) where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(notification) = outbound.recv().await {
        let frame = match notification.to_message() {
            Ok(frame) => frame,
            Err(e) => {
                error!(conn_id = %conn, "Failed to serialize notification: {}", e);
                continue;
            }
        };
        if let Err(e) = sink.send(frame).await {
            debug!(conn_id = %conn, "Write failed: {}", e);
            return;
        }
    }

    debug!(conn_id = %conn, "Deregistered, closing socket");
    let _ = sink.send(Message::Close(None)).await;
}

/// Run a reader on its own task; a panic inside it is logged and counted
/// instead of propagating.
pub(crate) async fn run_supervised<F>(conn: ConnectionId, reader: F, metrics: &ServerMetrics)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::spawn(reader).await {
        Ok(()) => {}
        Err(e) if e.is_panic() => {
            metrics.reader_panicked();
            error!(conn_id = %conn, "Reader task panicked: {}", e);
        }
        Err(e) => {
            warn!(conn_id = %conn, "Reader task cancelled: {}", e);
        }
    }
}
