//! Poll endpoints.

use axum::{Json, Router, extract::State, routing::post};
use polis_common::AppResult;
use polis_core::{PollResult, PollSpec, PollView, WindowPhase};
use polis_db::entities::{
    poll::{self, QuestionType, VisibilityMode},
    poll_option,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthActor, MaybeActor},
    middleware::AppState,
    response::ApiResponse,
};

// ==================== Request/Response Types ====================

/// Poll response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub created_at: String,
    pub parent_id: String,
    pub author_id: String,
    pub question: String,
    pub question_type: QuestionType,
    pub visibility_mode: VisibilityMode,
    pub expert_only: bool,
    pub allow_vote_change: bool,
    pub start_at: String,
    pub end_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mid_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<WindowPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<PollOptionResponse>>,
}

impl From<poll::Model> for PollResponse {
    fn from(p: poll::Model) -> Self {
        Self {
            id: p.id,
            created_at: p.created_at.to_rfc3339(),
            parent_id: p.parent_id,
            author_id: p.author_id,
            question: p.question,
            question_type: p.question_type,
            visibility_mode: p.visibility_mode,
            expert_only: p.expert_only,
            allow_vote_change: p.allow_vote_change,
            start_at: p.start_at.to_rfc3339(),
            end_at: p.end_at.to_rfc3339(),
            scale_points: p.scale_points,
            min_label: p.min_label,
            mid_label: p.mid_label,
            max_label: p.max_label,
            archived_at: p.archived_at.map(|at| at.to_rfc3339()),
            phase: None,
            options: None,
        }
    }
}

impl From<PollView> for PollResponse {
    fn from(view: PollView) -> Self {
        Self {
            phase: Some(view.phase),
            options: Some(view.options.into_iter().map(Into::into).collect()),
            ..Self::from(view.poll)
        }
    }
}

/// Poll option response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResponse {
    pub id: String,
    pub text: String,
    pub position: i32,
}

impl From<poll_option::Model> for PollOptionResponse {
    fn from(o: poll_option::Model) -> Self {
        Self {
            id: o.id,
            text: o.text,
            position: o.position,
        }
    }
}

/// Create poll request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[validate(length(min = 1, max = 64))]
    pub parent_id: String,
    #[serde(flatten)]
    pub spec: PollSpec,
}

/// Request addressing one poll.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PollIdRequest {
    #[validate(length(min = 1, max = 64))]
    pub poll_id: String,
}

/// List polls request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListPollsRequest {
    #[validate(length(min = 1, max = 64))]
    pub parent_id: String,
}

// ==================== Handlers ====================

/// Define a poll on a content item.
async fn create_poll(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    let view = state
        .poll_service
        .create_poll(&req.parent_id, &actor.id, req.spec)
        .await?;

    Ok(ApiResponse::ok(view.into()))
}

/// Get a poll with its options.
async fn show_poll(
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    let view = state.poll_service.get_poll(&req.poll_id).await?;
    Ok(ApiResponse::ok(view.into()))
}

/// List polls attached to a content item.
async fn list_polls(
    State(state): State<AppState>,
    Json(req): Json<ListPollsRequest>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    req.validate()?;

    let polls = state.poll_service.list_polls(&req.parent_id).await?;
    Ok(ApiResponse::ok(polls.into_iter().map(Into::into).collect()))
}

/// Close a poll early.
async fn archive_poll(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    let poll = state
        .poll_service
        .archive_poll(&req.poll_id, &actor.id)
        .await?;
    Ok(ApiResponse::ok(poll.into()))
}

/// Get poll results, subject to the poll's visibility mode.
async fn results(
    MaybeActor(actor): MaybeActor,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<PollResult>> {
    req.validate()?;

    let viewer_id = actor.map(|a| a.id);
    let result = state
        .visibility_gate
        .results(&req.poll_id, viewer_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(result))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_poll))
        .route("/show", post(show_poll))
        .route("/list", post(list_polls))
        .route("/archive", post(archive_poll))
        .route("/results", post(results))
}
