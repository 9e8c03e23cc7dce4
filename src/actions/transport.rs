//! Outbound transport seam for action envelopes.
//!
//! The sender never waits on the network: `send` hands the envelope off and
//! returns. Results come back later through `ActionSender::on_result`.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

use super::ActionType;

/// What actually goes over the wire for one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub player_id: u64,
    pub action_type: ActionType,
    /// JSON-encoded payload for `action_type`
    pub action_data: String,
    /// Milliseconds since Unix epoch
    pub timestamp: i64,
    pub sequence_number: u64,
}

impl ActionEnvelope {
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport disconnected")]
    Disconnected,
    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Fire-and-forget sink for outbound actions
pub trait ActionTransport: Send + Sync {
    fn send(&mut self, envelope: &ActionEnvelope) -> Result<(), TransportError>;
}

/// In-process transport over an mpsc channel.
///
/// The receiving half plays the role of the server: tests and the demo
/// binary read envelopes from it and feed `ActionResult`s back.
pub struct ChannelTransport {
    tx: Sender<ActionEnvelope>,
}

impl ChannelTransport {
    pub fn new() -> (Self, Receiver<ActionEnvelope>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl ActionTransport for ChannelTransport {
    fn send(&mut self, envelope: &ActionEnvelope) -> Result<(), TransportError> {
        self.tx
            .send(envelope.clone())
            .map_err(|_| TransportError::Disconnected)
    }
}
