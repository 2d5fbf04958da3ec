use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{CoordinatorContext, CoreEvent, SessionId};

/// One attributed, timestamped unit of transcribed speech.
///
/// Immutable once appended. `produced_at` is the moment the speech was
/// produced according to the client, not the moment the fragment arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub speaker: String,
    pub text: String,
    pub produced_at: DateTime<Utc>,
}

/// Merges concurrently-arriving transcript fragments into one log per
/// session.
///
/// Fragments are stored in arrival order. The transport gives no ordering
/// guarantee across speakers, so consumers presenting a transcript must use
/// [Self::ordered_fragments], which sorts by `produced_at`.
#[derive(Clone)]
pub struct TranscriptAggregator {
    context: CoordinatorContext,
    logs: Arc<DashMap<SessionId, Vec<Fragment>>>,
}

impl TranscriptAggregator {
    pub fn new(context: &CoordinatorContext) -> Self {
        Self {
            context: context.clone(),
            logs: Default::default(),
        }
    }

    /// Appends a fragment to a session's log, creating the log on first use.
    ///
    /// Empty and whitespace-only fragments are discarded. Repeated identical
    /// text is kept: repeated speech is legitimate, and the aggregator is
    /// purely additive.
    pub fn append(&self, session_id: &SessionId, speaker: &str, text: &str, produced_at: DateTime<Utc>) {
        let text = text.trim();

        if text.is_empty() {
            return;
        }

        let fragment = Fragment {
            speaker: speaker.to_string(),
            text: text.to_string(),
            produced_at,
        };

        self.logs
            .entry(session_id.clone())
            .or_default()
            .push(fragment.clone());

        self.context.emit(CoreEvent::FragmentAppended {
            session_id: session_id.clone(),
            fragment,
        });
    }

    /// The session's fragments in arrival order.
    pub fn fragments(&self, session_id: &SessionId) -> Vec<Fragment> {
        self.logs
            .get(session_id)
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// The session's fragments ordered by the time they were produced, with
    /// arrival order breaking ties.
    pub fn ordered_fragments(&self, session_id: &SessionId) -> Vec<Fragment> {
        let mut fragments = self.fragments(session_id);
        fragments.sort_by_key(|f| f.produced_at);

        fragments
    }

    pub fn is_empty(&self, session_id: &SessionId) -> bool {
        self.fragments(session_id).is_empty()
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;
    use crate::{Config, Coordinator};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn test_merge_is_deterministic_under_produced_at() {
        let coordinator = Coordinator::new(Config::default());
        let transcripts = &coordinator.transcripts;
        let session = "s1".to_string();

        // F1 was produced later but arrives first
        transcripts.append(&session, "alice", "first said", at(5));
        transcripts.append(&session, "bob", "actually earlier", at(3));

        let arrival: Vec<_> = transcripts
            .fragments(&session)
            .into_iter()
            .map(|f| f.text)
            .collect();
        assert_eq!(
            arrival,
            vec!["first said", "actually earlier"],
            "the log preserves arrival order"
        );

        let ordered: Vec<_> = transcripts
            .ordered_fragments(&session)
            .into_iter()
            .map(|f| f.text)
            .collect();
        assert_eq!(
            ordered,
            vec!["actually earlier", "first said"],
            "consumers see produced_at order"
        );
    }

    #[test]
    fn test_empty_fragments_are_discarded() {
        let coordinator = Coordinator::new(Config::default());
        let transcripts = &coordinator.transcripts;
        let session = "s1".to_string();

        transcripts.append(&session, "alice", "", at(1));
        transcripts.append(&session, "alice", "   ", at(2));

        assert!(transcripts.is_empty(&session), "nothing was appended");

        transcripts.append(&session, "alice", "hello", at(3));
        transcripts.append(&session, "alice", "", at(4));

        assert_eq!(transcripts.fragments(&session).len(), 1);
    }

    #[test]
    fn test_repeated_speech_is_not_deduplicated() {
        let coordinator = Coordinator::new(Config::default());
        let transcripts = &coordinator.transcripts;
        let session = "s1".to_string();

        transcripts.append(&session, "alice", "are you there", at(1));
        transcripts.append(&session, "alice", "are you there", at(2));

        assert_eq!(transcripts.fragments(&session).len(), 2);
    }

    #[test]
    fn test_sessions_do_not_cross_talk() {
        let coordinator = Coordinator::new(Config::default());
        let transcripts = &coordinator.transcripts;

        transcripts.append(&"s1".to_string(), "alice", "in one", at(1));
        transcripts.append(&"s2".to_string(), "bob", "in two", at(1));

        assert_eq!(transcripts.fragments(&"s1".to_string()).len(), 1);
        assert_eq!(transcripts.fragments(&"s2".to_string()).len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_appends_merge() {
        let coordinator = Arc::new(Coordinator::new(Config::default()));
        let session = "s1".to_string();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let coordinator = coordinator.clone();
                let session = session.clone();

                tokio::task::spawn_blocking(move || {
                    coordinator
                        .transcripts
                        .append(&session, "speaker", &format!("chunk {}", i), at(i));
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(
            coordinator.transcripts.fragments(&session).len(),
            16,
            "no append is lost to the lazily created log"
        );
    }
}
