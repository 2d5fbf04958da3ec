mod room;

use std::sync::Arc;

use dashmap::DashMap;
use log::info;

pub use room::*;

use crate::{CoordinatorContext, CoreEvent, PeerId, SessionId};

/// Tracks which peers are present in which session's room.
///
/// Membership is ephemeral: every peer id in a member set corresponds to a
/// currently-connected transport, and a peer is a member of at most one room
/// at a time.
#[derive(Clone)]
pub struct RoomRegistry {
    context: CoordinatorContext,
    rooms: Arc<DashMap<SessionId, Room>>,
    sessions_by_peer: Arc<DashMap<PeerId, SessionId>>,
}

/// The result of admitting a peer into a room.
pub enum JoinOutcome {
    /// The peer was admitted. Contains the members present before the join.
    Joined { existing: Vec<Member> },
    /// The peer was already a member. Nothing changed.
    AlreadyMember { existing: Vec<Member> },
}

impl RoomRegistry {
    pub fn new(context: &CoordinatorContext) -> Self {
        Self {
            context: context.clone(),
            rooms: Default::default(),
            sessions_by_peer: Default::default(),
        }
    }

    /// Admits a peer into a session's room.
    ///
    /// Joining a room the peer is already a member of mutates nothing and
    /// returns the unchanged member set.
    pub fn join(&self, session_id: &SessionId, new_member: NewMember) -> JoinOutcome {
        let mut room = self.rooms.entry(session_id.clone()).or_default();

        if room.contains(&new_member.peer_id) {
            return JoinOutcome::AlreadyMember {
                existing: room.members_except(&new_member.peer_id),
            };
        }

        let existing = room.members();
        let peer_id = new_member.peer_id.clone();

        room.admit(Member::new(new_member));
        let member_count = room.len();
        drop(room);

        self.sessions_by_peer
            .insert(peer_id.clone(), session_id.clone());

        info!(
            "Peer {} joined room {} ({} members)",
            peer_id, session_id, member_count
        );

        self.context.emit(CoreEvent::MemberJoined {
            session_id: session_id.clone(),
            peer_id,
            member_count,
        });

        JoinOutcome::Joined { existing }
    }

    /// Removes a peer from a session's room. Returns false if the peer wasn't
    /// a member, which is a no-op rather than an error.
    pub fn leave(&self, session_id: &SessionId, peer_id: &PeerId) -> bool {
        let Some(mut room) = self.rooms.get_mut(session_id) else {
            return false;
        };

        if !room.remove(peer_id) {
            return false;
        }

        let member_count = room.len();
        drop(room);

        self.rooms.remove_if(session_id, |_, room| room.is_empty());
        self.sessions_by_peer
            .remove_if(peer_id, |_, session| session == session_id);

        info!(
            "Peer {} left room {} ({} members remain)",
            peer_id, session_id, member_count
        );

        self.context.emit(CoreEvent::MemberLeft {
            session_id: session_id.clone(),
            peer_id: peer_id.clone(),
            member_count,
        });

        true
    }

    /// A snapshot of the members currently in a session's room.
    pub fn members_of(&self, session_id: &SessionId) -> Vec<Member> {
        self.rooms
            .get(session_id)
            .map(|room| room.members())
            .unwrap_or_default()
    }

    /// Like [Self::members_of], but only the peer ids.
    pub fn peer_ids_of(&self, session_id: &SessionId) -> Vec<PeerId> {
        self.members_of(session_id)
            .into_iter()
            .map(|m| m.peer_id)
            .collect()
    }

    pub fn is_member(&self, session_id: &SessionId, peer_id: &PeerId) -> bool {
        self.rooms
            .get(session_id)
            .map(|room| room.contains(peer_id))
            .unwrap_or(false)
    }

    /// The session a peer is currently a member of, if any.
    pub fn session_of(&self, peer_id: &PeerId) -> Option<SessionId> {
        self.sessions_by_peer.get(peer_id).map(|s| s.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Config, Coordinator};

    fn member(peer_id: &str) -> NewMember {
        NewMember {
            peer_id: peer_id.to_string(),
            display_name: peer_id.to_uppercase(),
        }
    }

    #[test]
    fn test_member_set_follows_joins_and_leaves() {
        let coordinator = Coordinator::new(Config::default());
        let registry = &coordinator.registry;
        let session = "s1".to_string();

        registry.join(&session, member("a"));
        registry.join(&session, member("b"));
        registry.join(&session, member("c"));
        registry.leave(&session, &"b".to_string());

        let mut members = registry.peer_ids_of(&session);
        members.sort();

        assert_eq!(members, vec!["a", "c"], "set equals joins minus leaves");

        registry.join(&session, member("b"));
        let mut members = registry.peer_ids_of(&session);
        members.sort();

        assert_eq!(members, vec!["a", "b", "c"], "rejoin adds the peer back");
    }

    #[test]
    fn test_join_is_idempotent() {
        let coordinator = Coordinator::new(Config::default());
        let registry = &coordinator.registry;
        let session = "s1".to_string();

        registry.join(&session, member("a"));
        registry.join(&session, member("b"));

        let outcome = registry.join(&session, member("a"));

        assert!(
            matches!(outcome, JoinOutcome::AlreadyMember { .. }),
            "second join reports existing membership"
        );

        if let JoinOutcome::AlreadyMember { existing } = outcome {
            let ids: Vec<_> = existing.into_iter().map(|m| m.peer_id).collect();
            assert_eq!(ids, vec!["b"], "existing set excludes the peer itself");
        }

        assert_eq!(
            registry.peer_ids_of(&session).len(),
            2,
            "member set is unchanged"
        );
    }

    #[test]
    fn test_leave_of_absent_peer_is_a_noop() {
        let coordinator = Coordinator::new(Config::default());
        let registry = &coordinator.registry;
        let session = "s1".to_string();

        assert!(!registry.leave(&session, &"ghost".to_string()));

        registry.join(&session, member("a"));

        assert!(registry.leave(&session, &"a".to_string()));
        assert!(
            !registry.leave(&session, &"a".to_string()),
            "duplicate disconnects deduplicate to one effective leave"
        );
    }

    #[test]
    fn test_tracks_the_session_of_each_peer() {
        let coordinator = Coordinator::new(Config::default());
        let registry = &coordinator.registry;
        let session = "s1".to_string();

        assert_eq!(registry.session_of(&"a".to_string()), None);

        registry.join(&session, member("a"));
        assert_eq!(registry.session_of(&"a".to_string()), Some(session.clone()));

        registry.leave(&session, &"a".to_string());
        assert_eq!(registry.session_of(&"a".to_string()), None);
    }
}
