//! Scenario endpoints

pub mod types;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::{ReadScenarios, WriteScenarios};
use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, OkResponse, ok};
use crate::domain::ScenarioService;

use types::{CreateScenarioRequest, ScenarioDto, ScenarioSummaryDto, UpdateScenarioRequest};

#[derive(Clone)]
pub struct ScenariosApiState {
    pub scenarios: ScenarioService,
}

pub fn routes(scenarios: ScenarioService) -> Router {
    Router::new()
        .route("/", get(list_scenarios).post(create_scenario))
        .route(
            "/{scenario_id}",
            get(get_scenario).put(update_scenario).delete(delete_scenario),
        )
        .route("/{scenario_id}/duplicate", post(duplicate_scenario))
        .with_state(ScenariosApiState { scenarios })
}

#[utoipa::path(
    get,
    path = "/api/scenarios",
    tag = "scenarios",
    responses((status = 200, description = "Scenarios with turn counts", body = Vec<ScenarioSummaryDto>))
)]
pub async fn list_scenarios(
    State(state): State<ScenariosApiState>,
    auth: ReadScenarios,
) -> Result<Json<Vec<ScenarioSummaryDto>>, ApiError> {
    let scenarios = state.scenarios.list(&auth.ctx).await?;
    Ok(Json(
        scenarios.into_iter().map(ScenarioSummaryDto::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/scenarios",
    tag = "scenarios",
    request_body = CreateScenarioRequest,
    responses(
        (status = 201, description = "Scenario created", body = ScenarioDto),
        (status = 400, description = "Invalid or duplicate name")
    )
)]
pub async fn create_scenario(
    State(state): State<ScenariosApiState>,
    auth: WriteScenarios,
    ValidatedJson(body): ValidatedJson<CreateScenarioRequest>,
) -> Result<(StatusCode, Json<ScenarioDto>), ApiError> {
    let scenario = state.scenarios.create(&auth.ctx, body.into()).await?;
    Ok((StatusCode::CREATED, Json(scenario.into())))
}

#[utoipa::path(
    get,
    path = "/api/scenarios/{scenario_id}",
    tag = "scenarios",
    params(("scenario_id" = String, Path, description = "Scenario ID")),
    responses(
        (status = 200, description = "Scenario with turns", body = ScenarioDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn get_scenario(
    State(state): State<ScenariosApiState>,
    auth: ReadScenarios,
    Path(scenario_id): Path<String>,
) -> Result<Json<ScenarioDto>, ApiError> {
    Ok(Json(state.scenarios.get(&auth.ctx, &scenario_id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/scenarios/{scenario_id}",
    tag = "scenarios",
    params(("scenario_id" = String, Path, description = "Scenario ID")),
    request_body = UpdateScenarioRequest,
    responses(
        (status = 200, description = "Scenario updated", body = ScenarioDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn update_scenario(
    State(state): State<ScenariosApiState>,
    auth: WriteScenarios,
    Path(scenario_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateScenarioRequest>,
) -> Result<Json<ScenarioDto>, ApiError> {
    let scenario = state
        .scenarios
        .update(&auth.ctx, &scenario_id, body.into())
        .await?;
    Ok(Json(scenario.into()))
}

#[utoipa::path(
    delete,
    path = "/api/scenarios/{scenario_id}",
    tag = "scenarios",
    params(("scenario_id" = String, Path, description = "Scenario ID")),
    responses(
        (status = 200, description = "Scenario deleted", body = OkResponse),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn delete_scenario(
    State(state): State<ScenariosApiState>,
    auth: WriteScenarios,
    Path(scenario_id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    state.scenarios.delete(&auth.ctx, &scenario_id).await?;
    Ok(ok())
}

/// Copy a scenario with its turns under the next free "(Copy N)" name
#[utoipa::path(
    post,
    path = "/api/scenarios/{scenario_id}/duplicate",
    tag = "scenarios",
    params(("scenario_id" = String, Path, description = "Scenario ID")),
    responses(
        (status = 201, description = "Copy created", body = ScenarioDto),
        (status = 404, description = "Not found in the active organization")
    )
)]
pub async fn duplicate_scenario(
    State(state): State<ScenariosApiState>,
    auth: WriteScenarios,
    Path(scenario_id): Path<String>,
) -> Result<(StatusCode, Json<ScenarioDto>), ApiError> {
    let copy = state.scenarios.duplicate(&auth.ctx, &scenario_id).await?;
    Ok((StatusCode::CREATED, Json(copy.into())))
}
