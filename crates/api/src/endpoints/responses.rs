//! Poll response endpoints.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use polis_common::AppResult;
use polis_core::{PartialPayload, ResponsePayload, ResponseWithOptions};
use polis_db::entities::poll_response::{self, ResponseStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::AuthActor,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

// ==================== Request/Response Types ====================

/// Poll response (answer) response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub poll_id: String,
    pub respondent_id: String,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
    pub option_ids: Vec<String>,
}

impl From<poll_response::Model> for AnswerResponse {
    fn from(r: poll_response::Model) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
            poll_id: r.poll_id,
            respondent_id: r.respondent_id,
            status: r.status,
            option_id: r.option_id,
            value: r.likert_value,
            option_ids: Vec::new(),
        }
    }
}

impl From<ResponseWithOptions> for AnswerResponse {
    fn from(r: ResponseWithOptions) -> Self {
        Self {
            option_ids: r.option_ids,
            ..Self::from(r.response)
        }
    }
}

/// Submit response request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[validate(length(min = 1, max = 64))]
    pub poll_id: String,
    pub payload: ResponsePayload,
}

/// Update response request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[validate(length(min = 1, max = 64))]
    pub poll_id: String,
    #[validate(length(min = 1, max = 64))]
    pub response_id: String,
    pub option_id: Option<String>,
    pub value: Option<i32>,
}

/// Withdraw response request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    #[validate(length(min = 1, max = 64))]
    pub poll_id: String,
    #[validate(length(min = 1, max = 64))]
    pub response_id: String,
}

/// Replace options request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOptionsRequest {
    #[validate(length(min = 1, max = 64))]
    pub poll_id: String,
    #[validate(length(min = 1, max = 64))]
    pub response_id: Option<String>,
    #[validate(length(min = 1))]
    pub option_ids: Vec<String>,
}

/// Own response request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    #[validate(length(min = 1, max = 64))]
    pub poll_id: String,
}

// ==================== Handlers ====================

/// Answer a `single_choice` or likert poll.
async fn submit(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    req.validate()?;

    let response = state
        .ledger
        .submit(&req.poll_id, &actor.respondent(), req.payload)
        .await?;
    Ok(ApiResponse::ok(response.into()))
}

/// Change an existing answer.
async fn update(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UpdateRequest>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    req.validate()?;

    let partial = PartialPayload {
        option_id: req.option_id,
        value: req.value,
    };
    let response = state
        .ledger
        .update(&req.poll_id, &req.response_id, &actor.respondent(), partial)
        .await?;
    Ok(ApiResponse::ok(response.into()))
}

/// Withdraw an answer.
async fn withdraw(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    state
        .ledger
        .withdraw(&req.poll_id, &req.response_id, &actor.id)
        .await?;
    Ok(no_content())
}

/// Replace the selection set of a `multi_choice` answer.
async fn replace_options(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ReplaceOptionsRequest>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    req.validate()?;

    let response = state
        .ledger
        .replace_options(
            &req.poll_id,
            req.response_id.as_deref(),
            &actor.respondent(),
            &req.option_ids,
        )
        .await?;
    Ok(ApiResponse::ok(response.into()))
}

/// Get the caller's own answer.
async fn mine(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    req.validate()?;

    let response = state
        .ledger
        .get_own_response(&req.poll_id, &actor.id)
        .await?;
    Ok(ApiResponse::ok(response.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/update", post(update))
        .route("/withdraw", post(withdraw))
        .route("/replace-options", post(replace_options))
        .route("/mine", post(mine))
}
