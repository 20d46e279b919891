//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{
    api_keys, auth, health, organizations, prompts, scenarios, simulate, variables,
};
use crate::api::types::OkResponse;
use crate::data::types::{InvitationStatus, MemberStatus, PromptStatus, Role, TurnType};
use crate::domain::OrgContext;
use crate::domain::simulation::{
    ChatMessage, ChatRole, ModelOptions, PromptVariant, SimulationEvent, SimulationTranscript,
    TurnMessage,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PromptBench API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Multi-tenant prompt testing"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "organizations", description = "Organizations, members and invitations"),
        (name = "prompts", description = "System prompts"),
        (name = "scenarios", description = "Conversation scenarios"),
        (name = "variables", description = "Placeholder variables"),
        (name = "api-keys", description = "LLM provider keys"),
        (name = "simulate", description = "Side-by-side prompt simulation")
    ),
    paths(
        // Health
        health::health,
        // Auth
        auth::exchange_token,
        auth::auth_status,
        auth::logout,
        // Organizations
        organizations::list_organizations,
        organizations::create_org,
        organizations::current_org,
        organizations::rename_org,
        organizations::delete_org,
        organizations::switch_org,
        organizations::list_members,
        organizations::update_member_role,
        organizations::remove_member,
        organizations::invite_member,
        organizations::list_invitations,
        organizations::resend_invitation,
        organizations::revoke_invitation,
        // Prompts
        prompts::list_prompts,
        prompts::create_prompt,
        prompts::get_prompt,
        prompts::update_prompt,
        prompts::delete_prompt,
        prompts::duplicate_prompt,
        // Scenarios
        scenarios::list_scenarios,
        scenarios::create_scenario,
        scenarios::get_scenario,
        scenarios::update_scenario,
        scenarios::delete_scenario,
        scenarios::duplicate_scenario,
        // Variables
        variables::list_variables,
        variables::create_variable,
        variables::get_variable,
        variables::update_variable,
        variables::delete_variable,
        // Provider keys
        api_keys::list_provider_keys,
        api_keys::save_provider_key,
        api_keys::deactivate_provider_key,
        // Simulation
        simulate::simulate,
    ),
    components(schemas(
        OkResponse,
        Role,
        MemberStatus,
        InvitationStatus,
        PromptStatus,
        TurnType,
        OrgContext,
        // Health
        health::HealthResponse,
        // Auth
        auth::ExchangeRequest,
        auth::ExchangeResponse,
        auth::UserDto,
        auth::AuthStatusResponse,
        // Organizations
        organizations::types::OrganizationDto,
        organizations::types::OrgWithRoleDto,
        organizations::types::MemberDto,
        organizations::types::InvitationDto,
        organizations::types::OrgNameRequest,
        organizations::types::UpdateMemberRoleRequest,
        organizations::types::InviteRequest,
        organizations::types::InviteResponse,
        organizations::types::DeleteOrgResponse,
        // Prompts
        prompts::types::PromptDto,
        prompts::types::CreatePromptRequest,
        prompts::types::UpdatePromptRequest,
        // Scenarios
        scenarios::types::ScenarioSummaryDto,
        scenarios::types::ScenarioDto,
        scenarios::types::TurnDto,
        scenarios::types::TurnInput,
        scenarios::types::CreateScenarioRequest,
        scenarios::types::UpdateScenarioRequest,
        // Variables
        variables::types::VariableDto,
        variables::types::CreateVariableRequest,
        variables::types::UpdateVariableRequest,
        // Provider keys
        api_keys::types::ProviderKeyDto,
        api_keys::types::SaveProviderKeyRequest,
        // Simulation
        simulate::SimulateRequest,
        SimulationEvent,
        PromptVariant,
        TurnMessage,
        SimulationTranscript,
        ChatMessage,
        ChatRole,
        ModelOptions,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>PromptBench API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;
