use log::info;

use crate::{
    AnalysisData, HuddleContext, NewSessionData, SessionData, Store, StoreError, Summarizer,
    Transcriber,
};

/// Administrative operations over sessions, delegated to the persistence
/// collaborator.
pub struct SessionManager<Db, Ai> {
    context: HuddleContext<Db, Ai>,
}

impl<Db, Ai> SessionManager<Db, Ai>
where
    Db: Store,
    Ai: Transcriber + Summarizer,
{
    pub(crate) fn new(context: &HuddleContext<Db, Ai>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Creates a new session in `Scheduled` status.
    pub async fn create(&self, new_session: NewSessionData) -> Result<SessionData, StoreError> {
        let session = self.context.store.create_session(new_session).await?;

        info!("Created session {} ({})", session.id, session.title);

        Ok(session)
    }

    pub async fn list(&self) -> Result<Vec<SessionData>, StoreError> {
        self.context.store.list_sessions().await
    }

    pub async fn by_id(&self, session_id: &str) -> Result<SessionData, StoreError> {
        self.context.store.session_by_id(session_id).await
    }

    /// The analysis record of a session. When the store has no record yet,
    /// the live in-memory log still counts: fragments exist the moment a
    /// client sends them, whether or not persistence kept up.
    pub async fn analysis(&self, session_id: &str) -> Result<AnalysisData, StoreError> {
        match self.context.store.analysis_by_session(session_id).await {
            Ok(analysis) => Ok(analysis),
            Err(StoreError::NotFound { .. }) => {
                let fragments = self
                    .context
                    .coordinator
                    .transcripts
                    .fragments(&session_id.to_string());

                if fragments.is_empty() {
                    return Err(StoreError::NotFound {
                        resource: "analysis",
                        identifier: session_id.to_string(),
                    });
                }

                Ok(AnalysisData {
                    session_id: session_id.to_string(),
                    transcript: fragments,
                    summary: None,
                    action_items: Vec::new(),
                    summary_generated_at: None,
                })
            }
            Err(err) => Err(err),
        }
    }
}
