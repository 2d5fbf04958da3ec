use chrono::{DateTime, Utc};

use crate::PeerId;

/// A participant of a session's room.
///
/// Exists only for the duration of one room membership. The peer id is the
/// stable user identity, reused as the peer-connection identity by the
/// external media layer.
#[derive(Debug, Clone)]
pub struct Member {
    pub peer_id: PeerId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

/// A member about to be admitted into a room.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub peer_id: PeerId,
    pub display_name: String,
}

/// The peers currently present in one session's room.
#[derive(Debug, Default)]
pub struct Room {
    members: Vec<Member>,
}

impl Member {
    pub fn new(new_member: NewMember) -> Self {
        Self {
            peer_id: new_member.peer_id,
            display_name: new_member.display_name,
            joined_at: Utc::now(),
        }
    }
}

impl Room {
    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.members.iter().any(|m| &m.peer_id == peer_id)
    }

    pub fn admit(&mut self, member: Member) {
        self.members.push(member)
    }

    /// Removes a member. Returns false if the peer wasn't one.
    pub fn remove(&mut self, peer_id: &PeerId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| &m.peer_id != peer_id);

        self.members.len() != before
    }

    pub fn members(&self) -> Vec<Member> {
        self.members.clone()
    }

    pub fn members_except(&self, peer_id: &PeerId) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| &m.peer_id != peer_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
