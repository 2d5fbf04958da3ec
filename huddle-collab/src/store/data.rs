use chrono::{DateTime, Utc};
use huddle_core::{Fragment, SessionId};
use serde::{Deserialize, Serialize};

/// The lifecycle status of a session.
///
/// Created externally as `Scheduled`, a session goes `Live` when the first
/// participant joins its room, and `Completed` once analysis is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Scheduled,
    Live,
    Completed,
}

/// A scheduled or running huddle session.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: SessionId,
    pub title: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: SessionStatus,
    /// The verified identity of the user that created the session
    pub created_by: String,
}

#[derive(Debug)]
pub struct NewSessionData {
    pub title: String,
    pub scheduled_for: DateTime<Utc>,
    pub created_by: String,
}

/// The analysis record of a session: its transcript plus whatever the
/// summarization collaborator produced. Created lazily on the first
/// fragment, never deleted by this system.
#[derive(Debug, Clone)]
pub struct AnalysisData {
    pub session_id: SessionId,
    /// Fragments in arrival order. Present a transcript to a human or a
    /// model through [Self::ordered_transcript], never through this field.
    pub transcript: Vec<Fragment>,
    pub summary: Option<String>,
    pub action_items: Vec<String>,
    pub summary_generated_at: Option<DateTime<Utc>>,
}

/// A generated summary about to be attached to an analysis record.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub summary: String,
    pub action_items: Vec<String>,
}

impl AnalysisData {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            transcript: Vec::new(),
            summary: None,
            action_items: Vec::new(),
            summary_generated_at: None,
        }
    }

    /// The transcript ordered by the time each fragment was produced, with
    /// arrival order breaking ties.
    pub fn ordered_transcript(&self) -> Vec<Fragment> {
        let mut fragments = self.transcript.clone();
        fragments.sort_by_key(|f| f.produced_at);

        fragments
    }
}
