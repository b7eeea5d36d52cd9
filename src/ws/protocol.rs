//! Wire messages exchanged over the push channel
//!
//! The result push is a flat object with a `shortenedURL` key (no type
//! tag); connected clients depend on that exact spelling.

use serde::{Deserialize, Serialize};

pub const MSG_TYPE_CONNECTION: &str = "connection";
pub const MSG_TYPE_ACKNOWLEDGMENT: &str = "acknowledgment";

/// Server -> client, sent once right after the channel opens. The only
/// way a client learns its identity.
#[derive(Debug, Serialize)]
pub struct Handshake {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: HandshakePayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakePayload {
    pub client_id: String,
}

impl Handshake {
    pub fn new(client_id: &str) -> Self {
        Handshake {
            kind: MSG_TYPE_CONNECTION,
            payload: HandshakePayload {
                client_id: client_id.to_string(),
            },
        }
    }
}

/// Server -> client, the generated result.
#[derive(Debug, Serialize)]
pub struct ResultPush {
    #[serde(rename = "shortenedURL")]
    pub shortened_url: String,
}

/// Client -> server envelope. The payload is kept raw so unrecognized
/// kinds can be ignored without failing deserialization.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgmentPayload {
    pub short_code: String,
}
