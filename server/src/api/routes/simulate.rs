//! SSE endpoint for side-by-side prompt simulation
//!
//! Setup errors (missing key, unknown scenario, empty scenario) are returned
//! as ordinary JSON errors. Once the stream starts, every frame is
//! `data: <event json>` and failures arrive as `error` events.

use std::convert::Infallible;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use axum::routing::post;
use serde::Deserialize;
use tokio::sync::watch;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::ReadScenarios;
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::domain::simulation::ModelOptions;
use crate::domain::{SimulationEvent, SimulationRequest, SimulationService};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    #[validate(length(min = 1, message = "Scenario is required"))]
    pub scenario_id: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    /// System prompt of the current variant, sent as the first message
    pub current_prompt: String,
    /// System prompt of the edited variant
    pub edited_prompt: String,
    #[serde(default)]
    pub options: ModelOptions,
}

impl From<SimulateRequest> for SimulationRequest {
    fn from(body: SimulateRequest) -> Self {
        Self {
            scenario_id: body.scenario_id,
            model: body.model,
            current_prompt: body.current_prompt,
            edited_prompt: body.edited_prompt,
            options: body.options,
        }
    }
}

#[derive(Clone)]
pub struct SimulateState {
    pub simulation: SimulationService,
    pub shutdown_rx: watch::Receiver<bool>,
}

pub fn routes(simulation: SimulationService, shutdown_rx: watch::Receiver<bool>) -> Router {
    Router::new()
        .route("/", post(simulate))
        .with_state(SimulateState {
            simulation,
            shutdown_rx,
        })
}

fn event_frame(event: &SimulationEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(data) => Some(Event::default().data(data)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize simulation event");
            None
        }
    }
}

/// Replay a scenario under the current and edited prompts
#[utoipa::path(
    post,
    path = "/api/simulate",
    tag = "simulate",
    request_body = SimulateRequest,
    responses(
        (status = 200, description = "Event stream of SimulationEvent frames", content_type = "text/event-stream", body = SimulationEvent),
        (status = 400, description = "NO_API_KEY, EMPTY_SCENARIO or validation error"),
        (status = 404, description = "Scenario not found in the active organization")
    )
)]
pub async fn simulate(
    State(state): State<SimulateState>,
    auth: ReadScenarios,
    ValidatedJson(body): ValidatedJson<SimulateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let prepared = state.simulation.prepare(&auth.ctx, body.into()).await?;
    tracing::debug!(
        org_id = %auth.ctx.active_org_id,
        scenario = %prepared.scenario_name(),
        "Simulation started"
    );

    let mut events = prepared.start();
    let mut shutdown_rx = state.shutdown_rx.clone();

    let stream = async_stream::stream! {
        let mut finished = false;
        let mut watching_shutdown = true;
        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed(), if watching_shutdown => {
                    if changed.is_err() {
                        watching_shutdown = false;
                    } else if *shutdown_rx.borrow() {
                        let error = SimulationEvent::Error {
                            prompt_type: None,
                            error: "Server is shutting down".to_string(),
                        };
                        if let Some(frame) = event_frame(&error) {
                            yield Ok::<_, Infallible>(frame);
                        }
                        break;
                    }
                }
                next = events.recv() => {
                    let Some(event) = next else { break };
                    finished = matches!(event, SimulationEvent::Done);
                    if let Some(frame) = event_frame(&event) {
                        yield Ok(frame);
                    }
                    if finished {
                        break;
                    }
                }
            }
        }
        if !finished && !*shutdown_rx.borrow() {
            tracing::warn!("Simulation stream closed before completion");
            let error = SimulationEvent::Error {
                prompt_type: None,
                error: "Simulation ended unexpectedly".to_string(),
            };
            if let Some(frame) = event_frame(&error) {
                yield Ok(frame);
            }
        }
    };

    Ok(Sse::new(stream))
}
