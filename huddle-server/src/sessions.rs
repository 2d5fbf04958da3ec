use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json,
};
use huddle_collab::NewSessionData;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewSessionSchema, TranscribeParamsSchema, ValidatedJson},
    serialized::{Analysis, Session, ToSerialized, TranscribedChunk},
    Router,
};

async fn create_session(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewSessionSchema>,
) -> ServerResult<Json<Session>> {
    let session = context
        .huddle
        .sessions
        .create(NewSessionData {
            title: body.title,
            scheduled_for: body.scheduled_for,
            created_by: body.created_by,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

async fn list_sessions(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Session>>> {
    let sessions = context.huddle.sessions.list().await?;

    Ok(Json(sessions.to_serialized()))
}

async fn session(
    State(context): State<ServerContext>,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Session>> {
    let session = context.huddle.sessions.by_id(&session_id).await?;

    Ok(Json(session.to_serialized()))
}

async fn analysis(
    State(context): State<ServerContext>,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Analysis>> {
    let analysis = context.huddle.sessions.analysis(&session_id).await?;

    Ok(Json(analysis.to_serialized()))
}

/// Summarizes the session's transcript and completes the session.
async fn generate_analysis(
    State(context): State<ServerContext>,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Analysis>> {
    let analysis = context.huddle.lifecycle.generate_analysis(&session_id).await?;

    Ok(Json(analysis.to_serialized()))
}

/// Transcribes an uploaded audio chunk and appends the text to the
/// session's transcript. The audio bytes pass through opaquely.
async fn transcribe(
    State(context): State<ServerContext>,
    Path(session_id): Path<String>,
    Query(params): Query<TranscribeParamsSchema>,
    body: Bytes,
) -> ServerResult<Json<TranscribedChunk>> {
    let text = context
        .huddle
        .lifecycle
        .transcribe_chunk(&session_id, &params.speaker, body.to_vec())
        .await?;

    Ok(Json(TranscribedChunk { text }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sessions))
        .route("/", post(create_session))
        .route("/:id", get(session))
        .route("/:id/analysis", get(analysis))
        .route("/:id/analysis", post(generate_analysis))
        .route("/:id/transcribe", post(transcribe))
}
