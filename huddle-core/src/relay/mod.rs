mod sink;

use std::sync::Arc;

use dashmap::DashMap;
use log::debug;
use serde_json::Value;

pub use sink::*;

use crate::{get_or_create_handle, CoordinatorContext, Id, PeerId, RoomRegistry, SessionId};

/// Routes signaling events between the peers of a session.
///
/// The relay guarantees that every pair of concurrently-present peers
/// completes a bidirectional offer/answer exchange exactly once: a joining
/// peer first learns about everyone already present, and only after the join
/// grace interval are the existing members told to call the new peer.
#[derive(Clone)]
pub struct SignalingRelay {
    context: CoordinatorContext,
    registry: RoomRegistry,
    sinks: Arc<DashMap<PeerId, Arc<dyn PeerSink>>>,
    pending_joins: Arc<DashMap<(SessionId, PeerId), PendingJoin>>,
}

/// A join broadcast waiting for the grace interval to elapse.
struct PendingJoin {
    id: Id<PendingJoin>,
    /// The members that were present when the join happened. Peers joining
    /// during the grace interval learn about the new peer through their own
    /// member list instead.
    recipients: Vec<PeerId>,
}

impl SignalingRelay {
    pub fn new(context: &CoordinatorContext, registry: &RoomRegistry) -> Self {
        Self {
            context: context.clone(),
            registry: registry.clone(),
            sinks: Default::default(),
            pending_joins: Default::default(),
        }
    }

    /// Registers the outbound transport of a peer. A second attach for the
    /// same peer replaces the previous transport.
    pub fn attach(&self, peer_id: &PeerId, sink: Arc<dyn PeerSink>) {
        self.sinks.insert(peer_id.clone(), sink);
    }

    pub fn detach(&self, peer_id: &PeerId) {
        self.sinks.remove(peer_id);
    }

    /// Sends a peer the current member list of its room, excluding itself.
    pub fn send_existing_peers(&self, peer_id: &PeerId, existing: &[PeerId]) {
        self.send_to(
            peer_id,
            OutboundEvent::ExistingPeers {
                peer_ids: existing.to_vec(),
            },
        );
    }

    /// Performs the two-phase join delivery for a newly admitted peer.
    ///
    /// Phase one is synchronous: the new peer receives the member list before
    /// this function returns. Phase two, the broadcast to the members that
    /// were already present, fires after the grace interval unless the peer
    /// leaves first.
    pub fn announce_join(&self, session_id: &SessionId, peer_id: &PeerId, existing: &[PeerId]) {
        self.send_existing_peers(peer_id, existing);

        if existing.is_empty() {
            return;
        }

        let pending = PendingJoin {
            id: Id::new(),
            recipients: existing.to_vec(),
        };
        let generation = pending.id;

        self.pending_joins
            .insert((session_id.clone(), peer_id.clone()), pending);

        let relay = self.clone();
        let session_id = session_id.clone();
        let peer_id = peer_id.clone();
        let grace = self.context.config.join_grace();

        get_or_create_handle().spawn(async move {
            tokio::time::sleep(grace).await;
            relay.flush_join(&session_id, &peer_id, generation);
        });
    }

    /// Delivers a pending join broadcast, unless it was cancelled or
    /// superseded in the meantime.
    fn flush_join(&self, session_id: &SessionId, peer_id: &PeerId, generation: Id<PendingJoin>) {
        let removed = self
            .pending_joins
            .remove_if(&(session_id.clone(), peer_id.clone()), |_, pending| {
                pending.id == generation
            });

        let Some((_, pending)) = removed else {
            return;
        };

        // The peer may have left between cancellation and this timer firing.
        // A "joined" notification for an absent peer must never go out.
        if !self.registry.is_member(session_id, peer_id) {
            return;
        }

        for recipient in pending.recipients {
            if !self.registry.is_member(session_id, &recipient) {
                continue;
            }

            self.send_to(
                &recipient,
                OutboundEvent::PeerJoined {
                    peer_id: peer_id.clone(),
                },
            );
        }
    }

    /// Cancels a pending join broadcast, if one exists.
    pub fn cancel_join(&self, session_id: &SessionId, peer_id: &PeerId) {
        self.pending_joins
            .remove(&(session_id.clone(), peer_id.clone()));
    }

    /// Tells the remaining members that a peer left, so each can release any
    /// half-open call state towards it. The caller deduplicates disconnects:
    /// this fires once per effective removal.
    pub fn announce_leave(&self, session_id: &SessionId, peer_id: &PeerId) {
        self.cancel_join(session_id, peer_id);
        self.detach(peer_id);

        for remaining in self.registry.peer_ids_of(session_id) {
            self.send_to(
                &remaining,
                OutboundEvent::PeerLeft {
                    peer_id: peer_id.clone(),
                },
            );
        }
    }

    /// Relays an opaque signaling payload.
    ///
    /// With a target, the payload is delivered verbatim if the target is
    /// still a room member, and silently dropped otherwise. Without one, it
    /// is broadcast to every member except the origin. Returns whether all
    /// deliveries went through; a dropped delivery is never an error.
    pub fn forward(
        &self,
        session_id: &SessionId,
        origin: &PeerId,
        target: Option<&PeerId>,
        payload: Value,
    ) -> bool {
        match target {
            Some(target) => {
                if !self.registry.is_member(session_id, target) {
                    debug!(
                        "Dropping signal from {} to {}: target is not in room {}",
                        origin, target, session_id
                    );
                    return false;
                }

                self.send_to(
                    target,
                    OutboundEvent::Signal {
                        origin_peer_id: origin.clone(),
                        payload,
                    },
                )
            }
            None => self
                .registry
                .peer_ids_of(session_id)
                .iter()
                .filter(|peer| *peer != origin)
                .map(|peer| {
                    self.send_to(
                        peer,
                        OutboundEvent::Signal {
                            origin_peer_id: origin.clone(),
                            payload: payload.clone(),
                        },
                    )
                })
                .fold(true, |all, delivered| all && delivered),
        }
    }

    fn send_to(&self, peer_id: &PeerId, event: OutboundEvent) -> bool {
        let Some(sink) = self.sinks.get(peer_id) else {
            debug!("No transport attached for peer {}", peer_id);
            return false;
        };

        let delivered = sink.send(event);

        if !delivered {
            debug!("Delivery to peer {} failed", peer_id);
        }

        delivered
    }
}
