use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
};
use futures_util::Stream;
use huddle_collab::{HuddleEvent, SessionStatus};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    collections::VecDeque,
    convert::Infallible,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll, Waker},
};
use huddle_core::Id;

use crate::{
    context::ServerContext,
    serialized::{ToSerialized, TranscriptFragment},
    Router,
};

type ConnectionId = Id<Connection>;

/// Events streamed to dashboard clients watching session activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// A peer became a member of a session's room.
    PeerJoined {
        session_id: String,
        peer_id: String,
        member_count: usize,
    },
    /// A peer left a session's room.
    PeerLeft {
        session_id: String,
        peer_id: String,
        member_count: usize,
    },
    /// A transcript fragment was appended to a session's log.
    TranscriptUpdated {
        session_id: String,
        fragment: TranscriptFragment,
    },
    /// A session's persisted status changed.
    SessionStatusChanged {
        session_id: String,
        new_status: SessionStatus,
    },
}

impl From<HuddleEvent> for ServerEvent {
    fn from(value: HuddleEvent) -> Self {
        match value {
            HuddleEvent::PeerJoined {
                session_id,
                peer_id,
                member_count,
            } => Self::PeerJoined {
                session_id,
                peer_id,
                member_count,
            },
            HuddleEvent::PeerLeft {
                session_id,
                peer_id,
                member_count,
            } => Self::PeerLeft {
                session_id,
                peer_id,
                member_count,
            },
            HuddleEvent::FragmentAppended {
                session_id,
                fragment,
            } => Self::TranscriptUpdated {
                session_id,
                fragment: fragment.to_serialized(),
            },
            HuddleEvent::SessionStatusChanged {
                session_id,
                new_status,
            } => Self::SessionStatusChanged {
                session_id,
                new_status,
            },
        }
    }
}

/// Manages server sent event connections
pub struct ServerSentEvents {
    me: Weak<Self>,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: ConnectionId,
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: ConnectionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove the connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connections: Default::default(),
        })
    }

    pub fn broadcast(&self, event: ServerEvent) {
        let connections = self.connections.lock();

        for connection in connections.iter() {
            connection.send(event.clone())
        }
    }

    fn connect(&self) -> ConnectionHandle {
        let connection = Connection::new();
        let handle = connection.handle(self.me.clone());

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id)
    }
}

impl Connection {
    fn new() -> Self {
        Self {
            id: ConnectionId::new(),
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push_back(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        let next_event = pending_messages
            .pop_front()
            .map(|m| serde_json::to_string(&m).expect("serializes properly"));

        if let Some(event) = next_event {
            return Poll::Ready(Some(Ok(Event::default().data(event))));
        }

        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

async fn event_stream(State(context): State<ServerContext>) -> Sse<ConnectionHandle> {
    Sse::new(context.sse.connect()).keep_alive(KeepAlive::default())
}

pub fn router() -> Router {
    Router::new().route("/", get(event_stream))
}
