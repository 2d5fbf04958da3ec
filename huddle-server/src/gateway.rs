use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use huddle_core::{Id, NewMember, OutboundEvent, PeerId, PeerSink, SessionId};
use log::{debug, info};
use serde::Deserialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::{context::ServerContext, Router};

/// Messages a client can send over the gateway.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
enum ClientMessage {
    /// Enter a session's room. Must precede any signaling.
    JoinRoom {
        session_id: SessionId,
        peer_id: PeerId,
        #[serde(default)]
        display_name: Option<String>,
    },
    /// Relay an opaque signaling payload to one peer, or to the whole room
    /// when no target is given.
    Signal {
        session_id: SessionId,
        #[serde(default)]
        target_peer_id: Option<PeerId>,
        payload: serde_json::Value,
    },
    /// Contribute a transcript fragment.
    TranscriptFragment {
        session_id: SessionId,
        speaker: String,
        text: String,
        #[serde(default)]
        produced_at: Option<DateTime<Utc>>,
    },
}

/// The outbound half of one gateway connection. Events are queued to the
/// writer task, so the relay's synchronous sends never block on the socket.
struct GatewaySink {
    sender: UnboundedSender<OutboundEvent>,
}

impl PeerSink for GatewaySink {
    fn send(&self, event: OutboundEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Marker for gateway connection ids.
struct Connection;

async fn gateway(
    ws: WebSocketUpgrade,
    State(context): State<ServerContext>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, context))
}

async fn handle_connection(socket: WebSocket, context: ServerContext) {
    let connection_id: Id<Connection> = Id::new();
    let (mut outgoing, mut incoming) = socket.split();
    let (sender, mut receiver) = unbounded_channel::<OutboundEvent>();

    info!("Gateway connection {} opened", connection_id);

    let writer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let message = serde_json::to_string(&event).expect("serializes properly");

            if outgoing.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    // The room this connection joined, once it has
    let mut membership: Option<(SessionId, PeerId)> = None;

    while let Some(message) = incoming.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => handle_message(message, &context, &sender, &mut membership),
            Err(err) => debug!("Ignoring malformed gateway message: {}", err),
        }
    }

    // A dropped transport is the only leave signal there is. The registry
    // deduplicates, so a reconnecting client that already joined elsewhere
    // is unaffected.
    if let Some((session_id, peer_id)) = membership {
        context.huddle.coordinator.leave(&session_id, &peer_id);
    }

    writer.abort();
    info!("Gateway connection {} closed", connection_id);
}

fn handle_message(
    message: ClientMessage,
    context: &ServerContext,
    sender: &UnboundedSender<OutboundEvent>,
    membership: &mut Option<(SessionId, PeerId)>,
) {
    let coordinator = &context.huddle.coordinator;

    match message {
        ClientMessage::JoinRoom {
            session_id,
            peer_id,
            display_name,
        } => {
            let sink = Arc::new(GatewaySink {
                sender: sender.clone(),
            });

            coordinator.join(
                &session_id,
                NewMember {
                    peer_id: peer_id.clone(),
                    display_name: display_name.unwrap_or_else(|| peer_id.clone()),
                },
                sink,
            );

            *membership = Some((session_id, peer_id));
        }
        ClientMessage::Signal {
            session_id,
            target_peer_id,
            payload,
        } => {
            let Some((_, origin)) = membership.as_ref() else {
                debug!("Dropping signal from a connection that never joined");
                return;
            };

            coordinator.signal(&session_id, origin, target_peer_id.as_ref(), payload);
        }
        ClientMessage::TranscriptFragment {
            session_id,
            speaker,
            text,
            produced_at,
        } => {
            coordinator.transcripts.append(
                &session_id,
                &speaker,
                &text,
                produced_at.unwrap_or_else(Utc::now),
            );
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/", get(gateway))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_client_messages_deserialize() {
        let join: ClientMessage = serde_json::from_str(
            r#"{ "type": "join-room", "session_id": "s1", "peer_id": "u1" }"#,
        )
        .unwrap();
        assert!(matches!(
            join,
            ClientMessage::JoinRoom { display_name: None, .. }
        ));

        let signal: ClientMessage = serde_json::from_str(
            r#"{ "type": "signal", "session_id": "s1", "payload": { "sdp": "offer" } }"#,
        )
        .unwrap();
        assert!(matches!(
            signal,
            ClientMessage::Signal { target_peer_id: None, .. }
        ));

        let fragment: ClientMessage = serde_json::from_str(
            r#"{ "type": "transcript-fragment", "session_id": "s1", "speaker": "alice", "text": "hi" }"#,
        )
        .unwrap();
        assert!(matches!(fragment, ClientMessage::TranscriptFragment { .. }));
    }

    #[test]
    fn test_outbound_events_serialize_with_kebab_case_tags() {
        let event = OutboundEvent::ExistingPeers {
            peer_ids: vec!["u1".to_string()],
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "existing-peers");
        assert_eq!(json["peer_ids"][0], "u1");
    }
}
