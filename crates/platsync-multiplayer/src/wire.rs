//! Compact binary encoding of snapshots for the transport layer.

use serde::{Deserialize, Serialize};

use crate::snapshot::{PlayerId, PlayerStateSnapshot};

/// Errors produced while encoding or decoding snapshots.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] postcard::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] postcard::Error),
}

/// A snapshot addressed to a player, as sent between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub player: PlayerId,
    pub state: PlayerStateSnapshot,
}

/// Serialize a message with postcard.
pub fn encode_message(message: &StateMessage) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(message).map_err(WireError::Encode)
}

/// Deserialize a message produced by [`encode_message`].
pub fn decode_message(bytes: &[u8]) -> Result<StateMessage, WireError> {
    postcard::from_bytes(bytes).map_err(WireError::Decode)
}
