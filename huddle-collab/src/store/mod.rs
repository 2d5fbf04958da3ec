use async_trait::async_trait;
use huddle_core::Fragment;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistence collaborator failed or could not be reached.
    /// Signaling correctness never depends on persistence, so callers treat
    /// this as a warning, not a reason to disturb room state.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A resource doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
}

/// Represents a type that can persist huddle sessions and their analysis
/// records. The real store lives outside this system; an in-memory
/// reference implementation ships in [MemoryStore].
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn create_session(&self, new_session: NewSessionData) -> Result<SessionData>;
    async fn session_by_id(&self, session_id: &str) -> Result<SessionData>;
    async fn list_sessions(&self) -> Result<Vec<SessionData>>;
    async fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<SessionData>;

    async fn analysis_by_session(&self, session_id: &str) -> Result<AnalysisData>;
    /// Appends a fragment to a session's persisted transcript, creating the
    /// analysis record if this is the first fragment.
    async fn append_fragment(&self, session_id: &str, fragment: Fragment) -> Result<()>;
    async fn save_summary(&self, session_id: &str, summary: NewSummary) -> Result<AnalysisData>;
}
