//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use chrono::{DateTime, Utc};
use huddle_collab::{AnalysisData, SessionData, SessionStatus};
use huddle_core::Fragment;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: String,
    title: String,
    scheduled_for: DateTime<Utc>,
    status: SessionStatus,
    created_by: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptFragment {
    speaker: String,
    text: String,
    produced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    session_id: String,
    /// Fragments ordered by the time they were produced
    transcript: Vec<TranscriptFragment>,
    summary: Option<String>,
    action_items: Vec<String>,
    summary_generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribedChunk {
    pub text: String,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<Session> for SessionData {
    fn to_serialized(&self) -> Session {
        Session {
            id: self.id.clone(),
            title: self.title.clone(),
            scheduled_for: self.scheduled_for,
            status: self.status,
            created_by: self.created_by.clone(),
        }
    }
}

impl ToSerialized<TranscriptFragment> for Fragment {
    fn to_serialized(&self) -> TranscriptFragment {
        TranscriptFragment {
            speaker: self.speaker.clone(),
            text: self.text.clone(),
            produced_at: self.produced_at,
        }
    }
}

impl ToSerialized<Analysis> for AnalysisData {
    fn to_serialized(&self) -> Analysis {
        Analysis {
            session_id: self.session_id.clone(),
            // Arrival order is storage detail; humans get produced-at order
            transcript: self.ordered_transcript().to_serialized(),
            summary: self.summary.clone(),
            action_items: self.action_items.clone(),
            summary_generated_at: self.summary_generated_at,
        }
    }
}
