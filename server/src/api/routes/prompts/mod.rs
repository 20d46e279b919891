//! Prompt endpoints

pub mod types;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::{ReadPrompts, WritePrompts};
use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, OkResponse, ok};
use crate::domain::PromptService;

use types::{CreatePromptRequest, ListPromptsQuery, PromptDto, UpdatePromptRequest};

#[derive(Clone)]
pub struct PromptsApiState {
    pub prompts: PromptService,
}

pub fn routes(prompts: PromptService) -> Router {
    Router::new()
        .route("/", get(list_prompts).post(create_prompt))
        .route(
            "/{prompt_id}",
            get(get_prompt).put(update_prompt).delete(delete_prompt),
        )
        .route("/{prompt_id}/duplicate", post(duplicate_prompt))
        .with_state(PromptsApiState { prompts })
}

#[utoipa::path(
    get,
    path = "/api/prompts",
    tag = "prompts",
    params(ListPromptsQuery),
    responses((status = 200, description = "Prompts of the active organization", body = Vec<PromptDto>))
)]
pub async fn list_prompts(
    State(state): State<PromptsApiState>,
    auth: ReadPrompts,
    ValidatedQuery(query): ValidatedQuery<ListPromptsQuery>,
) -> Result<Json<Vec<PromptDto>>, ApiError> {
    let prompts = state.prompts.list(&auth.ctx, &query.into()).await?;
    Ok(Json(prompts.into_iter().map(PromptDto::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/prompts",
    tag = "prompts",
    request_body = CreatePromptRequest,
    responses(
        (status = 201, description = "Prompt created", body = PromptDto),
        (status = 400, description = "Invalid or duplicate name")
    )
)]
pub async fn create_prompt(
    State(state): State<PromptsApiState>,
    auth: WritePrompts,
    ValidatedJson(body): ValidatedJson<CreatePromptRequest>,
) -> Result<(StatusCode, Json<PromptDto>), ApiError> {
    let prompt = state.prompts.create(&auth.ctx, body.into()).await?;
    Ok((StatusCode::CREATED, Json(prompt.into())))
}

#[utoipa::path(
    get,
    path = "/api/prompts/{prompt_id}",
    tag = "prompts",
    params(("prompt_id" = String, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Prompt", body = PromptDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn get_prompt(
    State(state): State<PromptsApiState>,
    auth: ReadPrompts,
    Path(prompt_id): Path<String>,
) -> Result<Json<PromptDto>, ApiError> {
    Ok(Json(state.prompts.get(&auth.ctx, &prompt_id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/prompts/{prompt_id}",
    tag = "prompts",
    params(("prompt_id" = String, Path, description = "Prompt ID")),
    request_body = UpdatePromptRequest,
    responses(
        (status = 200, description = "Prompt updated", body = PromptDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn update_prompt(
    State(state): State<PromptsApiState>,
    auth: WritePrompts,
    Path(prompt_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdatePromptRequest>,
) -> Result<Json<PromptDto>, ApiError> {
    let prompt = state
        .prompts
        .update(&auth.ctx, &prompt_id, body.into())
        .await?;
    Ok(Json(prompt.into()))
}

#[utoipa::path(
    delete,
    path = "/api/prompts/{prompt_id}",
    tag = "prompts",
    params(("prompt_id" = String, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Prompt deleted", body = OkResponse),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn delete_prompt(
    State(state): State<PromptsApiState>,
    auth: WritePrompts,
    Path(prompt_id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    state.prompts.delete(&auth.ctx, &prompt_id).await?;
    Ok(ok())
}

/// Copy a prompt under the next free "(Copy N)" name, as DRAFT
#[utoipa::path(
    post,
    path = "/api/prompts/{prompt_id}/duplicate",
    tag = "prompts",
    params(("prompt_id" = String, Path, description = "Prompt ID")),
    responses(
        (status = 201, description = "Copy created", body = PromptDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn duplicate_prompt(
    State(state): State<PromptsApiState>,
    auth: WritePrompts,
    Path(prompt_id): Path<String>,
) -> Result<(StatusCode, Json<PromptDto>), ApiError> {
    let copy = state.prompts.duplicate(&auth.ctx, &prompt_id).await?;
    Ok((StatusCode::CREATED, Json(copy.into())))
}
