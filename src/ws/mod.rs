//! Client session registry and WebSocket push channel
//!
//! Every connected client gets a server-assigned identity, delivered in a
//! handshake message the moment the channel opens. The registry maps
//! identities to live channels and exposes a fire-and-forget push used by
//! the HTTP layer and the retry engine. Inbound messages are dispatched
//! by a type tag; the only functional kind is the acknowledgment that a
//! pushed result arrived.
//!
//! Channels are behind the [`PushChannel`] trait so the registry can be
//! exercised in tests without a live socket.

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, web};
use async_trait::async_trait;
use dashmap::DashMap;
use rand::RngExt;
use tracing::{error, info, warn};

pub mod protocol;

use crate::delivery::RetryEngine;
use crate::errors::{Result, ShortpushError};
use crate::storage::UrlStore;
use protocol::{AcknowledgmentPayload, Handshake, InboundMessage};

/// One half-duplex handle for pushing text frames to a connected client.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn send_text(&self, text: String) -> Result<()>;
}

/// Production [`PushChannel`] over an actix-ws session.
pub struct WsChannel {
    session: actix_ws::Session,
}

impl WsChannel {
    pub fn new(session: actix_ws::Session) -> Self {
        WsChannel { session }
    }
}

#[async_trait]
impl PushChannel for WsChannel {
    async fn send_text(&self, text: String) -> Result<()> {
        // Session handles are cheap clones over the connection's sender.
        let mut session = self.session.clone();
        session
            .text(text)
            .await
            .map_err(|_| ShortpushError::channel("WebSocket session closed"))
    }
}

/// Live identity -> channel map. Sessions are ephemeral: created on
/// connect, destroyed on disconnect, never persisted.
pub struct SessionRegistry {
    clients: DashMap<String, Arc<dyn PushChannel>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            clients: DashMap::new(),
        }
    }

    /// Registers a freshly opened channel and pushes the identity
    /// handshake over it. Returns the assigned client identity.
    pub async fn register(&self, channel: Arc<dyn PushChannel>) -> String {
        let client_id = self.generate_client_id();
        self.clients.insert(client_id.clone(), Arc::clone(&channel));

        let handshake = Handshake::new(&client_id);
        match serde_json::to_string(&handshake) {
            Ok(text) => {
                if let Err(e) = channel.send_text(text).await {
                    warn!("Failed to send handshake to {}: {}", client_id, e);
                }
            }
            Err(e) => error!("Failed to serialize handshake: {}", e),
        }

        client_id
    }

    /// Drops the identity from the registry. Pending deliveries are keyed
    /// by short code and stay untouched; pushes to this identity simply
    /// become no-ops.
    pub fn unregister(&self, client_id: &str) {
        self.clients.remove(client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Fire-and-forget push of a serialized payload. Returns whether the
    /// identity had a registered channel; an unknown or closed identity
    /// is only logged. Delivery confirmation arrives separately as an
    /// inbound acknowledgment.
    pub async fn push(&self, client_id: &str, text: String) -> bool {
        let channel = match self.clients.get(client_id) {
            Some(channel) => Arc::clone(&channel),
            None => {
                warn!("Client {} not connected or not ready", client_id);
                return false;
            }
        };

        if let Err(e) = channel.send_text(text).await {
            warn!("Push to client {} failed: {}", client_id, e);
        }
        true
    }

    fn generate_client_id(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let candidate = format!(
                "client-{}-{}",
                chrono::Utc::now().timestamp_millis(),
                rng.random_range(0..1000)
            );
            if !self.clients.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatches one inbound channel message by its type tag. Malformed
/// frames and unrecognized kinds are logged and discarded; the channel
/// stays open regardless.
pub async fn dispatch_inbound(
    client_id: &str,
    raw: &str,
    store: &Arc<UrlStore>,
    engine: &Arc<RetryEngine>,
) {
    let message: InboundMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(e) => {
            error!("Error parsing WebSocket message from {}: {}", client_id, e);
            return;
        }
    };

    match message.kind.as_str() {
        protocol::MSG_TYPE_ACKNOWLEDGMENT => {
            let payload: AcknowledgmentPayload = match serde_json::from_value(message.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Acknowledgment from {} missing shortCode: {}", client_id, e);
                    return;
                }
            };

            // Persist the acknowledgment before canceling the retry
            // timer, so a retry cannot race a not-yet-durable ack.
            if store.acknowledge(&payload.short_code) {
                engine.cancel(&payload.short_code);
            } else {
                warn!("Failed to acknowledge URL with code: {}", payload.short_code);
            }
        }
        other => {
            warn!("Unknown message type: {}", other);
        }
    }
}

/// WebSocket entry point: upgrades the request, registers the session
/// and spins up the inbound read loop.
pub async fn ws_entry(
    req: HttpRequest,
    body: web::Payload,
    registry: web::Data<Arc<SessionRegistry>>,
    store: web::Data<Arc<UrlStore>>,
    engine: web::Data<Arc<RetryEngine>>,
) -> actix_web::Result<HttpResponse> {
    let (response, session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let channel = Arc::new(WsChannel::new(session.clone()));
    let client_id = registry.register(channel).await;
    info!("WebSocket client connected: {}", client_id);

    actix_web::rt::spawn(async move {
        let mut session = session;
        while let Some(Ok(msg)) = msg_stream.recv().await {
            match msg {
                actix_ws::Message::Text(text) => {
                    dispatch_inbound(&client_id, &text, store.get_ref(), engine.get_ref()).await;
                }
                actix_ws::Message::Ping(bytes) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                actix_ws::Message::Close(_) => break,
                _ => {}
            }
        }

        info!("WebSocket client disconnected: {}", client_id);
        registry.unregister(&client_id);
    });

    Ok(response)
}
