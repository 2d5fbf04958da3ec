use std::sync::Arc;

use axum::extract::FromRef;
use huddle_collab::{Huddle, MemoryStore, OllamaClient};

use crate::sse::ServerSentEvents;

/// The concrete collab system this server binary runs: the in-memory store
/// and the Ollama-backed AI collaborators.
pub type ServerHuddle = Huddle<MemoryStore, OllamaClient>;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub huddle: Arc<ServerHuddle>,
    pub sse: Arc<ServerSentEvents>,
}
