//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and bridges one connection to one hub
//! subscription for the connection's lifetime.
//!
//! The serve loop waits on three things, in priority order: shutdown, the
//! subscription queue, and the peer's read half. Inbound frames are read only to notice the peer
//! going away; their payload is ignored. Every write is bounded by the hub's
//! write timeout.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::hub::{Hub, Subscription};
use crate::api::AppState;

/// Why a connection's serve loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Server shutdown or handler-level cancellation
    Cancelled,
    /// Peer sent a close frame or the stream ended
    PeerClosed,
    /// Reading from the peer failed
    ReadFailed,
    /// Writing an update failed
    WriteFailed,
    /// Writing an update did not finish before the deadline
    WriteTimeout,
    /// The hub removed this subscriber
    HubDropped,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CloseReason::Cancelled => "cancelled",
            CloseReason::PeerClosed => "peer_closed",
            CloseReason::ReadFailed => "read_failed",
            CloseReason::WriteFailed => "write_failed",
            CloseReason::WriteTimeout => "write_timeout",
            CloseReason::HubDropped => "hub_dropped",
        };
        f.write_str(reason)
    }
}

/// WebSocket upgrade handler
///
/// Upgrade failures are rejected by the extractor before anything is
/// registered with the hub.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    let cancel = state.shutdown.child_token();

    ws.on_failed_upgrade(|error| {
        tracing::warn!(error = %error, "WebSocket upgrade failed");
    })
    .on_upgrade(move |socket| handle_socket(socket, hub, cancel))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>, cancel: CancellationToken) {
    let write_timeout = hub.config().write_timeout;
    let subscription = hub.subscribe();
    let (sender, receiver) = socket.split();

    serve(subscription, sender, receiver, cancel, write_timeout).await;
}

/// Drain a subscription onto a connection until it closes
///
/// The subscription is dropped as soon as the loop ends, before the close
/// frame is sent, which unregisters it from the hub whichever way the loop
/// ended. Queued updates are served ahead of inbound frames so a chatty peer
/// cannot starve its own deliveries.
pub async fn serve<S, R, E>(
    mut subscription: Subscription,
    mut sender: S,
    mut receiver: R,
    cancel: CancellationToken,
    write_timeout: Duration,
) -> CloseReason
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let subscriber_id = subscription.id();

    let reason = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break CloseReason::Cancelled,

            update = subscription.recv() => {
                let Some(update) = update else {
                    break CloseReason::HubDropped;
                };

                match tokio::time::timeout(write_timeout, sender.send(update.to_ws_message())).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(
                            subscriber_id = %subscriber_id,
                            error = %e,
                            "WebSocket send failed, closing connection"
                        );
                        break CloseReason::WriteFailed;
                    }
                    Err(_) => {
                        tracing::warn!(
                            subscriber_id = %subscriber_id,
                            timeout_ms = write_timeout.as_millis() as u64,
                            "WebSocket send timed out, closing connection"
                        );
                        break CloseReason::WriteTimeout;
                    }
                }
            }

            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break CloseReason::PeerClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(
                        subscriber_id = %subscriber_id,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break CloseReason::ReadFailed;
                }
            },
        }
    };

    // Unregister before the close frame so a stuck peer stops accruing updates
    drop(subscription);

    // Best effort close frame; a stuck peer gets the same deadline as a write
    let _ = tokio::time::timeout(write_timeout, sender.close()).await;

    tracing::info!(subscriber_id = %subscriber_id, reason = %reason, "WebSocket disconnected");
    reason
}
