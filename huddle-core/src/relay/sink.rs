use serde::Serialize;
use serde_json::Value;

use crate::PeerId;

/// Events delivered to a peer's transport by the relay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum OutboundEvent {
    /// The members already present in the room, sent to a peer right after it
    /// joins so it can initiate signaling with each of them.
    ExistingPeers { peer_ids: Vec<PeerId> },
    /// A new peer finished joining and is ready to be called.
    PeerJoined { peer_id: PeerId },
    /// A peer left, so any half-open call state towards it can be released.
    PeerLeft { peer_id: PeerId },
    /// An opaque signaling payload, relayed verbatim.
    Signal { origin_peer_id: PeerId, payload: Value },
}

/// The outbound half of a peer's transport connection.
///
/// Implementations must not block. Delivery is fire-and-forget: the return
/// value only reports whether the event was handed to the transport, and the
/// relay never retries.
pub trait PeerSink: Send + Sync {
    fn send(&self, event: OutboundEvent) -> bool;
}
