use crossbeam::channel::{Receiver, Sender};

use crate::{Fragment, PeerId, SessionId};

pub type EventSender = Sender<CoreEvent>;
pub type EventReceiver = Receiver<CoreEvent>;

/// Describes the events that can be emitted by the coordination core.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// A peer became a member of a session's room.
    MemberJoined {
        session_id: SessionId,
        peer_id: PeerId,
        /// The number of members after the join.
        member_count: usize,
    },
    /// A peer left a session's room.
    MemberLeft {
        session_id: SessionId,
        peer_id: PeerId,
        /// The number of members remaining.
        member_count: usize,
    },
    /// A transcript fragment was appended to a session's log.
    FragmentAppended {
        session_id: SessionId,
        fragment: Fragment,
    },
}
