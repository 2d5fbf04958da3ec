use std::sync::Arc;

use crossbeam::channel::unbounded;

mod config;
mod events;
mod registry;
mod relay;
mod transcript;
mod util;

pub use config::*;
pub use events::*;
pub use registry::*;
pub use relay::*;
pub use transcript::*;
pub use util::*;

/// Identifies a session. Owned by the external scheduling store.
pub type SessionId = String;

/// Identifies a peer. The stable user id doubles as the peer-connection
/// identity used by the external media layer.
pub type PeerId = String;

/// The huddle coordination core, facilitating room membership, signaling,
/// and transcript aggregation.
///
/// Everything here is in-memory and synchronous: signaling latency is
/// user-perceptible and must never queue behind a store or AI round trip.
/// State is scoped to one process; a multi-process deployment has to
/// externalize the registry to keep the one-room-per-peer invariant.
pub struct Coordinator {
    pub registry: RoomRegistry,
    pub relay: SignalingRelay,
    pub transcripts: TranscriptAggregator,

    event_receiver: EventReceiver,
}

/// A type passed to the core components, to access config and emit events.
#[derive(Clone)]
pub struct CoordinatorContext {
    pub config: Config,

    event_sender: EventSender,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = CoordinatorContext {
            config,
            event_sender,
        };

        let registry = RoomRegistry::new(&context);
        let relay = SignalingRelay::new(&context, &registry);
        let transcripts = TranscriptAggregator::new(&context);

        Self {
            registry,
            relay,
            transcripts,
            event_receiver,
        }
    }

    /// Admits a peer into a session's room and performs the two-phase join
    /// delivery. Returns the peers that were present before the join.
    ///
    /// Re-joining a room the peer is already in re-sends the member list but
    /// mutates nothing and triggers no broadcast.
    pub fn join(
        &self,
        session_id: &SessionId,
        new_member: NewMember,
        sink: Arc<dyn PeerSink>,
    ) -> Vec<PeerId> {
        let peer_id = new_member.peer_id.clone();

        // A peer is a live member of at most one room. Joining elsewhere
        // releases the previous membership first, with its leave side effects.
        if let Some(previous) = self.registry.session_of(&peer_id) {
            if &previous != session_id {
                self.leave(&previous, &peer_id);
            }
        }

        self.relay.attach(&peer_id, sink);

        match self.registry.join(session_id, new_member) {
            JoinOutcome::Joined { existing } => {
                let existing: Vec<_> = existing.into_iter().map(|m| m.peer_id).collect();
                self.relay.announce_join(session_id, &peer_id, &existing);

                existing
            }
            JoinOutcome::AlreadyMember { existing } => {
                let existing: Vec<_> = existing.into_iter().map(|m| m.peer_id).collect();
                self.relay.send_existing_peers(&peer_id, &existing);

                existing
            }
        }
    }

    /// Removes a peer from a session's room. Duplicate disconnect reports
    /// deduplicate to a single leave broadcast.
    pub fn leave(&self, session_id: &SessionId, peer_id: &PeerId) {
        if self.registry.leave(session_id, peer_id) {
            self.relay.announce_leave(session_id, peer_id);
        }
    }

    /// Relays an opaque signaling payload. Returns false if a delivery was
    /// dropped, which the originator recovers from, not the relay.
    pub fn signal(
        &self,
        session_id: &SessionId,
        origin: &PeerId,
        target: Option<&PeerId>,
        payload: serde_json::Value,
    ) -> bool {
        self.relay.forward(session_id, origin, target, payload)
    }

    /// Receive events from the core.
    pub fn wait_for_event(&self) -> CoreEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }
}

impl CoordinatorContext {
    pub fn emit(&self, event: CoreEvent) {
        self.event_sender.send(event).expect("event is sent");
    }
}
