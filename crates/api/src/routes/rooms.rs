//! Room event routes
//!
//! The web app persists votes, stories and members itself, then calls these
//! endpoints (on behalf of the member) so the change reaches every open tab.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use poker_shared::{db, require, validate_vote, Member, Story};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
    websocket::{BroadcastReport, ServerEvent},
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub member_id: String,
    pub story_id: String,
    #[serde(default)]
    pub vote: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    pub story_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: String,
    pub member: Member,
}

/// How many live connections an event reached
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub delivered: usize,
}

impl From<BroadcastReport> for DeliveryResponse {
    fn from(report: BroadcastReport) -> Self {
        Self {
            delivered: report.delivered,
        }
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(inner)| inner).map_err(ApiError::from)
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /vote
///
/// The caller's own connections get the value first; the rest of the room
/// only learns that a vote was cast.
pub async fn vote(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Json<DeliveryResponse>> {
    let req = body(payload)?;
    require("memberId", &req.member_id)?;
    require("storyId", &req.story_id)?;
    validate_vote(req.vote)?;

    let room_id = &user.identity.room_id;

    let echoed = state
        .ws
        .send_to_user(
            room_id,
            &user.identity.user_id,
            &ServerEvent::SelfVoted {
                member_id: req.member_id.clone(),
                story_id: req.story_id.clone(),
                vote: req.vote,
            },
        )
        .await;

    let report = state
        .ws
        .broadcast(
            room_id,
            &ServerEvent::UserVoted {
                member_id: req.member_id,
                story_id: req.story_id,
            },
        )
        .await;

    tracing::debug!(
        room_id = %room_id,
        user_id = %user.identity.user_id,
        echoed,
        delivered = report.delivered,
        "Vote relayed"
    );

    Ok(Json(report.into()))
}

/// POST /story
pub async fn new_story(
    State(state): State<AppState>,
    _user: AuthUser,
    payload: Result<Json<Story>, JsonRejection>,
) -> ApiResult<Json<DeliveryResponse>> {
    let story = body(payload)?;
    story.validate()?;

    let room_id = story.room_id.clone();
    let report = state
        .ws
        .broadcast(&room_id, &ServerEvent::NewStory { story })
        .await;

    Ok(Json(report.into()))
}

/// POST /reveal-story
pub async fn reveal_story(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> ApiResult<Json<DeliveryResponse>> {
    let req = body(payload)?;
    require("storyId", &req.story_id)?;

    let votes = db::fetch_story_votes(&state.pool, &req.story_id).await?;

    tracing::debug!(
        room_id = %user.identity.room_id,
        story_id = %req.story_id,
        votes = votes.len(),
        "Revealing story"
    );

    let report = state
        .ws
        .broadcast(
            &user.identity.room_id,
            &ServerEvent::RevealStory {
                story_id: req.story_id,
                votes,
            },
        )
        .await;

    Ok(Json(report.into()))
}

/// POST /unreveal-story
pub async fn unreveal_story(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> ApiResult<Json<DeliveryResponse>> {
    let req = body(payload)?;
    require("storyId", &req.story_id)?;

    let report = state
        .ws
        .broadcast(
            &user.identity.room_id,
            &ServerEvent::UnrevealStory {
                story_id: req.story_id,
            },
        )
        .await;

    Ok(Json(report.into()))
}

/// POST /join
pub async fn join(
    State(state): State<AppState>,
    _user: AuthUser,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> ApiResult<Json<DeliveryResponse>> {
    let req = body(payload)?;
    require("roomId", &req.room_id)?;
    req.member.validate()?;

    let report = state
        .ws
        .broadcast(&req.room_id, &ServerEvent::MemberJoined { member: req.member })
        .await;

    Ok(Json(report.into()))
}
