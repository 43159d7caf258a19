use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pollcast_core::{validation, AppState};
use pollcast_models::{
    ArchivePoll, CreatePoll, DurationUpdated, Poll, PollSummary, UpdatePollDuration, VoteAccepted,
};
use pollcast_upstream::Voter;

use crate::error::ApiError;
use crate::middleware::{ClientIp, MaybeSession, Session, ValidJson};

const VOTE_FAILED_MESSAGE: &str = "An unknown error occurred while voting on the poll.";

pub async fn get_poll(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(poll_id): Path<String>,
) -> Result<Json<Poll>, ApiError> {
    validation::validate_poll_id(&state.config.limits, &poll_id)?;

    let id_token = session.as_ref().map(|s| s.id_token.as_str());
    let poll = state.upstream.get_poll(&poll_id, id_token).await?;
    Ok(Json(poll))
}

pub async fn list_my_polls(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<PollSummary>>, ApiError> {
    let polls = state.upstream.my_polls(&session.id_token).await?;
    Ok(Json(polls))
}

pub async fn create_poll(
    State(state): State<AppState>,
    session: Session,
    ValidJson(body): ValidJson<CreatePoll>,
) -> Result<(StatusCode, Json<Poll>), ApiError> {
    validation::validate_create_poll(&state.config.limits, &body)?;

    let poll = state.upstream.create_poll(&body, &session.id_token).await?;
    tracing::info!(
        "poll {} created with {} options",
        poll.poll_id,
        poll.options.len()
    );
    Ok((StatusCode::CREATED, Json(poll)))
}

pub async fn update_duration(
    State(state): State<AppState>,
    session: Session,
    Path(poll_id): Path<String>,
    ValidJson(body): ValidJson<UpdatePollDuration>,
) -> Result<Json<DurationUpdated>, ApiError> {
    validation::validate_poll_id(&state.config.limits, &poll_id)?;
    validation::validate_duration_update(&state.config.limits, body.duration)?;

    let updated = state
        .upstream
        .update_duration(&poll_id, &body, &session.id_token)
        .await?;
    Ok(Json(updated))
}

pub async fn archive_poll(
    State(state): State<AppState>,
    session: Session,
    Path(poll_id): Path<String>,
    ValidJson(body): ValidJson<ArchivePoll>,
) -> Result<StatusCode, ApiError> {
    validation::validate_poll_id(&state.config.limits, &poll_id)?;

    state
        .upstream
        .archive_poll(&poll_id, &body, &session.id_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cast a vote. Signed-in voters are identified by their id token,
/// anonymous ones by the client IP the edge proxy reports.
pub async fn vote(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    ClientIp(client_ip): ClientIp,
    Path((poll_id, option_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<VoteAccepted>), ApiError> {
    validation::validate_vote_params(&state.config.limits, &poll_id, &option_id)?;

    let voter = match session.as_ref() {
        Some(session) => Voter::Authenticated {
            id_token: &session.id_token,
        },
        None => Voter::Anonymous {
            user_ip: &client_ip,
        },
    };

    match state.upstream.vote(&poll_id, &option_id, voter).await {
        Ok(accepted) => Ok((StatusCode::ACCEPTED, Json(accepted))),
        Err(e) => {
            tracing::error!("vote on poll {} failed upstream: {}", poll_id, e);
            Err(ApiError::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: VOTE_FAILED_MESSAGE.to_string(),
            })
        }
    }
}
