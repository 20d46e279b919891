//! Provider API key endpoints
//!
//! Keys are stored encrypted per (organization, provider). Responses carry
//! only a masked hint.

pub mod types;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::ManageSettings;
use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, OkResponse, ok};
use crate::domain::ProviderKeyService;

use types::{ProviderKeyDto, ProviderQuery, SaveProviderKeyRequest};

#[derive(Clone)]
pub struct ApiKeysState {
    pub provider_keys: ProviderKeyService,
}

pub fn routes(provider_keys: ProviderKeyService) -> Router {
    Router::new()
        .route(
            "/",
            get(list_provider_keys)
                .post(save_provider_key)
                .delete(deactivate_provider_key),
        )
        .with_state(ApiKeysState { provider_keys })
}

#[utoipa::path(
    get,
    path = "/api/user/api-keys",
    tag = "api-keys",
    responses(
        (status = 200, description = "Stored keys, masked", body = Vec<ProviderKeyDto>),
        (status = 403, description = "Missing settings permission")
    )
)]
pub async fn list_provider_keys(
    State(state): State<ApiKeysState>,
    auth: ManageSettings,
) -> Result<Json<Vec<ProviderKeyDto>>, ApiError> {
    let keys = state.provider_keys.list(&auth.ctx).await?;
    Ok(Json(keys.into_iter().map(ProviderKeyDto::from).collect()))
}

/// Store or replace the key for a provider and mark it active
#[utoipa::path(
    post,
    path = "/api/user/api-keys",
    tag = "api-keys",
    request_body = SaveProviderKeyRequest,
    responses(
        (status = 200, description = "Key stored", body = ProviderKeyDto),
        (status = 500, description = "Encryption secret not configured")
    )
)]
pub async fn save_provider_key(
    State(state): State<ApiKeysState>,
    auth: ManageSettings,
    ValidatedJson(body): ValidatedJson<SaveProviderKeyRequest>,
) -> Result<Json<ProviderKeyDto>, ApiError> {
    let summary = state
        .provider_keys
        .upsert(&auth.ctx, &body.provider, &body.api_key)
        .await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    delete,
    path = "/api/user/api-keys",
    tag = "api-keys",
    params(ProviderQuery),
    responses(
        (status = 200, description = "Key deactivated", body = OkResponse),
        (status = 404, description = "No key stored for the provider")
    )
)]
pub async fn deactivate_provider_key(
    State(state): State<ApiKeysState>,
    auth: ManageSettings,
    ValidatedQuery(query): ValidatedQuery<ProviderQuery>,
) -> Result<Json<OkResponse>, ApiError> {
    state
        .provider_keys
        .deactivate(&auth.ctx, &query.provider)
        .await?;
    Ok(ok())
}
