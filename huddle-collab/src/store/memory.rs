use chrono::Utc;
use dashmap::DashMap;
use huddle_core::Fragment;

use async_trait::async_trait;

use super::{
    AnalysisData, NewSessionData, NewSummary, Result, SessionData, SessionStatus, Store, StoreError,
};
use crate::util::random_string;

/// An in-memory store, used for tests and single-process deployments
/// without an external database.
#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<String, SessionData>,
    analyses: DashMap<String, AnalysisData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_session(&self, new_session: NewSessionData) -> Result<SessionData> {
        let session = SessionData {
            id: random_string(24),
            title: new_session.title,
            scheduled_for: new_session.scheduled_for,
            status: SessionStatus::Scheduled,
            created_by: new_session.created_by,
        };

        self.sessions.insert(session.id.clone(), session.clone());

        Ok(session)
    }

    async fn session_by_id(&self, session_id: &str) -> Result<SessionData> {
        self.sessions
            .get(session_id)
            .map(|s| s.clone())
            .ok_or_else(|| StoreError::NotFound {
                resource: "session",
                identifier: session_id.to_string(),
            })
    }

    async fn list_sessions(&self) -> Result<Vec<SessionData>> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|s| s.clone()).collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.scheduled_for));

        Ok(sessions)
    }

    async fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<SessionData> {
        let mut session =
            self.sessions
                .get_mut(session_id)
                .ok_or_else(|| StoreError::NotFound {
                    resource: "session",
                    identifier: session_id.to_string(),
                })?;

        session.status = status;

        Ok(session.clone())
    }

    async fn analysis_by_session(&self, session_id: &str) -> Result<AnalysisData> {
        self.analyses
            .get(session_id)
            .map(|a| a.clone())
            .ok_or_else(|| StoreError::NotFound {
                resource: "analysis",
                identifier: session_id.to_string(),
            })
    }

    async fn append_fragment(&self, session_id: &str, fragment: Fragment) -> Result<()> {
        self.analyses
            .entry(session_id.to_string())
            .or_insert_with(|| AnalysisData::new(session_id))
            .transcript
            .push(fragment);

        Ok(())
    }

    async fn save_summary(&self, session_id: &str, summary: NewSummary) -> Result<AnalysisData> {
        let mut analysis = self
            .analyses
            .entry(session_id.to_string())
            .or_insert_with(|| AnalysisData::new(session_id));

        analysis.summary = Some(summary.summary);
        analysis.action_items = summary.action_items;
        analysis.summary_generated_at = Some(Utc::now());

        Ok(analysis.clone())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;

    fn fragment(speaker: &str, text: &str, seconds: i64) -> Fragment {
        Fragment {
            speaker: speaker.to_string(),
            text: text.to_string(),
            produced_at: chrono::Utc.timestamp_opt(seconds, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = MemoryStore::new();

        let session = store
            .create_session(NewSessionData {
                title: "Weekly sync".to_string(),
                scheduled_for: Utc::now(),
                created_by: "u1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Scheduled);

        let session = store
            .set_session_status(&session.id, SessionStatus::Live)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Live);

        let fetched = store.session_by_id(&session.id).await.unwrap();
        assert_eq!(fetched.status, SessionStatus::Live);

        let missing = store.session_by_id("nope").await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_append_upserts_the_analysis_record() {
        let store = MemoryStore::new();

        assert!(store.analysis_by_session("s1").await.is_err());

        store
            .append_fragment("s1", fragment("alice", "hello", 1))
            .await
            .unwrap();
        store
            .append_fragment("s1", fragment("bob", "hi", 2))
            .await
            .unwrap();

        let analysis = store.analysis_by_session("s1").await.unwrap();
        assert_eq!(analysis.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_appends_do_not_duplicate_the_record() {
        let store = Arc::new(MemoryStore::new());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();

                tokio::spawn(async move {
                    store
                        .append_fragment("s1", fragment("alice", &format!("chunk {}", i), i))
                        .await
                        .unwrap();
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        let analysis = store.analysis_by_session("s1").await.unwrap();
        assert_eq!(analysis.transcript.len(), 16, "every append is merged");
    }

    #[tokio::test]
    async fn test_save_summary_preserves_the_transcript() {
        let store = MemoryStore::new();

        store
            .append_fragment("s1", fragment("alice", "hello", 1))
            .await
            .unwrap();

        let analysis = store
            .save_summary(
                "s1",
                NewSummary {
                    summary: "A short meeting.".to_string(),
                    action_items: vec!["ship it".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(analysis.summary.as_deref(), Some("A short meeting."));
        assert_eq!(analysis.transcript.len(), 1, "appends are kept");
        assert!(analysis.summary_generated_at.is_some());
    }

    #[tokio::test]
    async fn test_ordered_transcript_sorts_by_produced_at() {
        let store = MemoryStore::new();

        store
            .append_fragment("s1", fragment("u1", "hello", 100))
            .await
            .unwrap();
        store
            .append_fragment("s1", fragment("u2", "hi", 99))
            .await
            .unwrap();

        let analysis = store.analysis_by_session("s1").await.unwrap();
        let ordered: Vec<_> = analysis
            .ordered_transcript()
            .into_iter()
            .map(|f| f.text)
            .collect();

        assert_eq!(ordered, vec!["hi", "hello"]);
    }
}
