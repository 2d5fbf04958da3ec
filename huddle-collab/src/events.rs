use crossbeam::channel::{Receiver, Sender};
use huddle_core::{CoreEvent, Fragment, PeerId, SessionId};

use crate::SessionStatus;

pub type EventSender = Sender<HuddleEvent>;
pub type EventReceiver = Receiver<HuddleEvent>;

/// Events emitted by the collab system, consumed by the server surface.
#[derive(Debug, Clone)]
pub enum HuddleEvent {
    /// A peer became a member of a session's room.
    PeerJoined {
        session_id: SessionId,
        peer_id: PeerId,
        member_count: usize,
    },
    /// A peer left a session's room.
    PeerLeft {
        session_id: SessionId,
        peer_id: PeerId,
        member_count: usize,
    },
    /// A transcript fragment was appended to a session's log.
    FragmentAppended {
        session_id: SessionId,
        fragment: Fragment,
    },
    /// A session's persisted status changed.
    SessionStatusChanged {
        session_id: SessionId,
        new_status: SessionStatus,
    },
}

impl HuddleEvent {
    /// Convert a core event to a friendly collab event
    pub fn from_core_event(event: CoreEvent) -> HuddleEvent {
        match event {
            CoreEvent::MemberJoined {
                session_id,
                peer_id,
                member_count,
            } => Self::PeerJoined {
                session_id,
                peer_id,
                member_count,
            },
            CoreEvent::MemberLeft {
                session_id,
                peer_id,
                member_count,
            } => Self::PeerLeft {
                session_id,
                peer_id,
                member_count,
            },
            CoreEvent::FragmentAppended {
                session_id,
                fragment,
            } => Self::FragmentAppended {
                session_id,
                fragment,
            },
        }
    }
}
