//! WebSocket streaming API.
//!
//! One socket per client session. The connection owns a private registry of
//! subscribed channel names driven by `subscribe`/`unsubscribe` messages
//! carrying post ids; an authenticated connection additionally gets its
//! personal notification channel attached at connect time. Events arriving
//! on the shared broadcast are forwarded only to connections whose registry
//! contains the event's channel, and the registry dies with the socket.

#![allow(missing_docs)]

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use ripple_common::{get_metrics, notification_channel, post_channel};
use ripple_core::services::ChannelMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for authentication.
    #[serde(rename = "i")]
    pub token: Option<String>,
}

/// Client-to-server message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to the channels of the given posts.
    Subscribe { post_ids: Vec<String> },
    /// Unsubscribe from the channels of the given posts.
    Unsubscribe { post_ids: Vec<String> },
}

/// Server-to-client message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Acknowledge a subscribe.
    Subscribed { channels: Vec<String> },
    /// Acknowledge an unsubscribe.
    Unsubscribed { channels: Vec<String> },
    /// A realtime event on a subscribed channel.
    Event {
        #[serde(flatten)]
        message: ChannelMessage,
    },
}

/// Shared state for streaming.
#[derive(Clone)]
pub struct StreamingState {
    /// Broadcast sender feeding every connection.
    tx: Arc<broadcast::Sender<ChannelMessage>>,
}

impl StreamingState {
    /// Create a new streaming state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx: Arc::new(tx) }
    }

    /// Feed an event into every connection's filter.
    pub fn publish(&self, message: ChannelMessage) {
        let _ = self.tx.send(message);
    }

    /// Subscribe a new receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.tx.subscribe()
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket handler for streaming.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("New streaming connection");

    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, query: StreamQuery, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Authenticate if token provided
    let user = if let Some(token) = &query.token {
        match state.user_service.authenticate_by_token(token).await {
            Ok(u) => Some(u),
            Err(e) => {
                warn!("Streaming auth failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let user_id = user.map(|u| u.id);

    info!(user_id = ?user_id, "Streaming connection established");
    get_metrics()
        .websocket_connections_active
        .fetch_add(1, Ordering::Relaxed);

    let mut rx = state.streaming.subscribe();

    // Per-connection channel registry. The personal notification channel is
    // attached once at session start, not per-post.
    let mut channels: HashSet<String> = HashSet::new();
    if let Some(ref id) = user_id {
        channels.insert(notification_channel(id));
    }

    loop {
        tokio::select! {
            // Handle incoming messages from client
            Some(msg) = receiver.next() => {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let response = handle_client_message(client_msg, &mut channels);
                                let json = serde_json::to_string(&response).unwrap_or_default();
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse client message: {}", e);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Client closed connection");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            // Forward events on subscribed channels
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        if !channels.contains(&message.channel) {
                            continue;
                        }
                        let msg = ServerMessage::Event { message };
                        let json = serde_json::to_string(&msg).unwrap_or_default();
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                        get_metrics()
                            .websocket_messages_sent
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Dropped events are acceptable: clients reconcile
                        // from the store on the next full fetch
                        debug!("Streaming receiver lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    get_metrics()
        .websocket_connections_active
        .fetch_sub(1, Ordering::Relaxed);
    info!("Streaming connection closed");
}

/// Apply a client message to the connection's channel registry.
fn handle_client_message(msg: ClientMessage, channels: &mut HashSet<String>) -> ServerMessage {
    match msg {
        ClientMessage::Subscribe { post_ids } => {
            let subscribed: Vec<String> = post_ids.iter().map(|id| post_channel(id)).collect();
            for channel in &subscribed {
                channels.insert(channel.clone());
            }
            debug!(count = subscribed.len(), "Channels subscribed");
            ServerMessage::Subscribed {
                channels: subscribed,
            }
        }
        ClientMessage::Unsubscribe { post_ids } => {
            let unsubscribed: Vec<String> = post_ids.iter().map(|id| post_channel(id)).collect();
            for channel in &unsubscribed {
                channels.remove(channel);
            }
            debug!(count = unsubscribed.len(), "Channels unsubscribed");
            ServerMessage::Unsubscribed {
                channels: unsubscribed,
            }
        }
    }
}
