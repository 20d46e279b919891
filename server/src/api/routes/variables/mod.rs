//! Variable endpoints
//!
//! Variables are `{{key}}` placeholders substituted into simulation messages.
//! Deleting one that is still referenced fails with `IN_USE` and lists the
//! referencing prompts and scenarios in `details`.

pub mod types;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::{ReadVariables, WriteVariables};
use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, OkResponse, ok};
use crate::domain::VariableService;

use types::{CreateVariableRequest, UpdateVariableRequest, VariableDto};

#[derive(Clone)]
pub struct VariablesApiState {
    pub variables: VariableService,
}

pub fn routes(variables: VariableService) -> Router {
    Router::new()
        .route("/", get(list_variables).post(create_variable))
        .route(
            "/{variable_id}",
            get(get_variable)
                .put(update_variable)
                .delete(delete_variable),
        )
        .with_state(VariablesApiState { variables })
}

#[utoipa::path(
    get,
    path = "/api/variables",
    tag = "variables",
    responses((status = 200, description = "Variables of the active organization", body = Vec<VariableDto>))
)]
pub async fn list_variables(
    State(state): State<VariablesApiState>,
    auth: ReadVariables,
) -> Result<Json<Vec<VariableDto>>, ApiError> {
    let variables = state.variables.list(&auth.ctx).await?;
    Ok(Json(variables.into_iter().map(VariableDto::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/variables",
    tag = "variables",
    request_body = CreateVariableRequest,
    responses(
        (status = 201, description = "Variable created", body = VariableDto),
        (status = 400, description = "Malformed or duplicate key")
    )
)]
pub async fn create_variable(
    State(state): State<VariablesApiState>,
    auth: WriteVariables,
    ValidatedJson(body): ValidatedJson<CreateVariableRequest>,
) -> Result<(StatusCode, Json<VariableDto>), ApiError> {
    let variable = state.variables.create(&auth.ctx, body.into()).await?;
    Ok((StatusCode::CREATED, Json(variable.into())))
}

#[utoipa::path(
    get,
    path = "/api/variables/{variable_id}",
    tag = "variables",
    params(("variable_id" = String, Path, description = "Variable ID")),
    responses(
        (status = 200, description = "Variable", body = VariableDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn get_variable(
    State(state): State<VariablesApiState>,
    auth: ReadVariables,
    Path(variable_id): Path<String>,
) -> Result<Json<VariableDto>, ApiError> {
    Ok(Json(state.variables.get(&auth.ctx, &variable_id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/variables/{variable_id}",
    tag = "variables",
    params(("variable_id" = String, Path, description = "Variable ID")),
    request_body = UpdateVariableRequest,
    responses(
        (status = 200, description = "Variable updated", body = VariableDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn update_variable(
    State(state): State<VariablesApiState>,
    auth: WriteVariables,
    Path(variable_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateVariableRequest>,
) -> Result<Json<VariableDto>, ApiError> {
    let variable = state
        .variables
        .update(&auth.ctx, &variable_id, body.into())
        .await?;
    Ok(Json(variable.into()))
}

#[utoipa::path(
    delete,
    path = "/api/variables/{variable_id}",
    tag = "variables",
    params(("variable_id" = String, Path, description = "Variable ID")),
    responses(
        (status = 200, description = "Variable deleted", body = OkResponse),
        (status = 400, description = "Variable still referenced (IN_USE)"),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn delete_variable(
    State(state): State<VariablesApiState>,
    auth: WriteVariables,
    Path(variable_id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    state.variables.delete(&auth.ctx, &variable_id).await?;
    Ok(ok())
}
