use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use huddle_core::Fragment;
use log::{info, warn};
use thiserror::Error;

use crate::{
    AiError, AiResult, AnalysisData, HuddleContext, HuddleEvent, NewSummary, SessionStatus, Store,
    StoreError, Summarizer, Transcriber,
};

/// Translates room activity into session status changes, and drives
/// analysis generation through the external collaborators.
pub struct LifecycleBridge<Db, Ai> {
    context: HuddleContext<Db, Ai>,
    collaborator_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Analysis was requested for a session without any transcript
    #[error("No transcript is available for this session")]
    NoTranscriptAvailable,
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<Db, Ai> LifecycleBridge<Db, Ai>
where
    Db: Store,
    Ai: Transcriber + Summarizer,
{
    pub(crate) fn new(context: &HuddleContext<Db, Ai>) -> Self {
        Self {
            context: context.clone(),
            collaborator_timeout: context.config.collaborator_timeout(),
        }
    }

    /// Marks a scheduled session live, called when its room gains its first
    /// member. Fire-and-forget: a store failure is logged and never blocks
    /// room operation.
    pub async fn activate_session(&self, session_id: &str) {
        let session = match self.context.store.session_by_id(session_id).await {
            Ok(session) => session,
            Err(err) => {
                warn!("Cannot check status of session {}: {}", session_id, err);
                return;
            }
        };

        if session.status != SessionStatus::Scheduled {
            return;
        }

        match self
            .context
            .store
            .set_session_status(session_id, SessionStatus::Live)
            .await
        {
            Ok(_) => {
                info!("Session {} is live", session_id);

                self.context.emit(HuddleEvent::SessionStatusChanged {
                    session_id: session_id.to_string(),
                    new_status: SessionStatus::Live,
                });
            }
            Err(err) => warn!("Failed to mark session {} live: {}", session_id, err),
        }
    }

    /// Summarizes a session's transcript through the summarization
    /// collaborator, stores the result, and completes the session.
    ///
    /// Fails fast without touching the store when no transcript exists.
    pub async fn generate_analysis(&self, session_id: &str) -> Result<AnalysisData, LifecycleError> {
        let fragments = self.transcript_of(session_id).await?;

        if fragments.is_empty() {
            return Err(LifecycleError::NoTranscriptAvailable);
        }

        let formatted = format_transcript(&fragments);
        let outcome = self
            .bounded(self.context.ai.summarize(&formatted))
            .await?;

        let analysis = self
            .context
            .store
            .save_summary(
                session_id,
                NewSummary {
                    summary: outcome.summary,
                    action_items: outcome.action_items,
                },
            )
            .await?;

        // Completion is requested from the store, not required: failing to
        // record it must not lose the generated summary.
        match self
            .context
            .store
            .set_session_status(session_id, SessionStatus::Completed)
            .await
        {
            Ok(_) => {
                info!("Session {} completed", session_id);

                self.context.emit(HuddleEvent::SessionStatusChanged {
                    session_id: session_id.to_string(),
                    new_status: SessionStatus::Completed,
                });
            }
            Err(err) => warn!("Failed to mark session {} completed: {}", session_id, err),
        }

        Ok(analysis)
    }

    /// Transcribes an uploaded audio chunk through the transcription
    /// collaborator and appends the text to the session's transcript.
    /// Returns the transcribed text, which may be empty for silence.
    pub async fn transcribe_chunk(
        &self,
        session_id: &str,
        speaker: &str,
        audio: Vec<u8>,
    ) -> Result<String, LifecycleError> {
        let text = self.bounded(self.context.ai.transcribe(audio)).await?;

        if !text.trim().is_empty() {
            self.context.coordinator.transcripts.append(
                &session_id.to_string(),
                speaker,
                &text,
                Utc::now(),
            );
        }

        Ok(text)
    }

    /// The fragments to summarize, in produced-at order. Prefers the live
    /// log; after a restart only the persisted record remains.
    async fn transcript_of(&self, session_id: &str) -> Result<Vec<Fragment>, LifecycleError> {
        let live = self
            .context
            .coordinator
            .transcripts
            .ordered_fragments(&session_id.to_string());

        if !live.is_empty() {
            return Ok(live);
        }

        match self.context.store.analysis_by_session(session_id).await {
            Ok(analysis) => Ok(analysis.ordered_transcript()),
            Err(StoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, AiError>
    where
        F: Future<Output = AiResult<T>>,
    {
        tokio::time::timeout(self.collaborator_timeout, call)
            .await
            .map_err(|_| AiError::Timeout)?
    }
}

impl<Db, Ai> Clone for LifecycleBridge<Db, Ai> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            collaborator_timeout: self.collaborator_timeout,
        }
    }
}

/// Formats a transcript as one `speaker: text` line per fragment, the shape
/// the summarization collaborator expects.
pub fn format_transcript(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| format!("{}: {}", f.speaker, f.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use huddle_core::Config;

    use super::*;
    use crate::{AiResult, Huddle, MemoryStore, NewSessionData, SummaryOutcome};

    #[derive(Default)]
    struct FakeAi {
        transcription: String,
        delay_in_millis: u64,
        summarized: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Summarizer for FakeAi {
        async fn summarize(&self, transcript: &str) -> AiResult<SummaryOutcome> {
            if self.delay_in_millis > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_in_millis)).await;
            }

            self.summarized.lock().unwrap().push(transcript.to_string());

            Ok(SummaryOutcome {
                summary: "A productive discussion.".to_string(),
                action_items: vec!["follow up".to_string()],
            })
        }
    }

    #[async_trait]
    impl Transcriber for FakeAi {
        async fn transcribe(&self, _audio: Vec<u8>) -> AiResult<String> {
            if self.delay_in_millis > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_in_millis)).await;
            }

            Ok(self.transcription.clone())
        }
    }

    fn huddle_with(ai: FakeAi) -> Huddle<MemoryStore, FakeAi> {
        Huddle::new(
            Config {
                collaborator_timeout_in_seconds: 0.1,
                ..Default::default()
            },
            MemoryStore::new(),
            ai,
        )
    }

    async fn scheduled_session(huddle: &Huddle<MemoryStore, FakeAi>) -> String {
        huddle
            .sessions
            .create(NewSessionData {
                title: "Standup".to_string(),
                scheduled_for: Utc::now(),
                created_by: "u1".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn at(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[tokio::test]
    async fn test_activation_moves_scheduled_sessions_to_live() {
        let huddle = huddle_with(FakeAi::default());
        let session_id = scheduled_session(&huddle).await;

        huddle.lifecycle.activate_session(&session_id).await;

        let session = huddle.sessions.by_id(&session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Live);

        // A second activation changes nothing
        huddle.lifecycle.activate_session(&session_id).await;
        let session = huddle.sessions.by_id(&session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Live);
    }

    #[tokio::test]
    async fn test_analysis_of_empty_transcript_fails_fast() {
        let huddle = huddle_with(FakeAi::default());
        let session_id = scheduled_session(&huddle).await;

        let result = huddle.lifecycle.generate_analysis(&session_id).await;

        assert!(matches!(
            result,
            Err(LifecycleError::NoTranscriptAvailable)
        ));

        let session = huddle.sessions.by_id(&session_id).await.unwrap();
        assert_eq!(
            session.status,
            SessionStatus::Scheduled,
            "a rejected request mutates nothing"
        );
    }

    #[tokio::test]
    async fn test_analysis_summarizes_in_produced_at_order() {
        let huddle = huddle_with(FakeAi::default());
        let session_id = scheduled_session(&huddle).await;

        // Arrival order is the opposite of speech order
        huddle
            .coordinator
            .transcripts
            .append(&session_id, "u1", "hello", at(100));
        huddle
            .coordinator
            .transcripts
            .append(&session_id, "u2", "hi", at(99));

        let analysis = huddle.lifecycle.generate_analysis(&session_id).await.unwrap();

        assert_eq!(analysis.summary.as_deref(), Some("A productive discussion."));
        assert_eq!(analysis.action_items, vec!["follow up"]);

        let summarized = huddle.context().ai.summarized.lock().unwrap().clone();
        assert_eq!(
            summarized,
            vec!["u2: hi\nu1: hello"],
            "the collaborator sees the transcript in produced-at order"
        );

        let session = huddle.sessions.by_id(&session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_slow_collaborators_time_out_without_mutation() {
        let huddle = huddle_with(FakeAi {
            delay_in_millis: 5_000,
            ..Default::default()
        });
        let session_id = scheduled_session(&huddle).await;

        huddle
            .coordinator
            .transcripts
            .append(&session_id, "u1", "hello", at(1));

        let result = huddle.lifecycle.generate_analysis(&session_id).await;

        assert!(matches!(result, Err(LifecycleError::Ai(AiError::Timeout))));

        let session = huddle.sessions.by_id(&session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Scheduled);
        assert!(
            huddle.context().store.analysis_by_session(&session_id).await.is_err(),
            "no partial analysis is committed"
        );
    }

    #[tokio::test]
    async fn test_transcribed_chunks_join_the_transcript() {
        let huddle = huddle_with(FakeAi {
            transcription: "we should ship on friday".to_string(),
            ..Default::default()
        });
        let session_id = scheduled_session(&huddle).await;

        let text = huddle
            .lifecycle
            .transcribe_chunk(&session_id, "alice", vec![0u8; 16])
            .await
            .unwrap();

        assert_eq!(text, "we should ship on friday");

        let fragments = huddle.coordinator.transcripts.fragments(&session_id);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].speaker, "alice");
    }

    #[tokio::test]
    async fn test_silent_chunks_append_nothing() {
        let huddle = huddle_with(FakeAi::default());
        let session_id = scheduled_session(&huddle).await;

        let text = huddle
            .lifecycle
            .transcribe_chunk(&session_id, "alice", vec![0u8; 16])
            .await
            .unwrap();

        assert!(text.is_empty());
        assert!(huddle.coordinator.transcripts.is_empty(&session_id));
    }
}
