//! Side-by-side prompt simulation
//!
//! A simulation replays the USER turns of a scenario twice, once under the
//! current system prompt and once under the edited one. Both replays run as
//! independent producers feeding one channel, so their events interleave in
//! arrival order on a single stream:
//!
//! ```text
//! start -> (message | complete)* from both variants -> done
//! ```
//!
//! Each variant walks its turns in order: resolve variables, emit the user
//! message, call the model, then emit the assistant reply. A failed call
//! becomes a sentinel reply and the replay continues with the next turn.

pub mod llm;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use utoipa::ToSchema;

use super::error::{DomainError, DomainResult};
use super::org_context::OrgContext;
use super::provider_keys::ProviderKeyService;
use super::scenarios::ScenarioService;
use super::variables::{VariableService, resolve_variables};
use crate::core::constants::{SIMULATION_ERROR_TEXT, SIMULATION_PROVIDER};

pub use llm::{
    ChatMessage, ChatRequest, ChatRole, LlmClient, LlmError, ModelOptions, OpenAiCompatibleClient,
};

/// Buffered events per simulation before producers wait on the client
const EVENT_BUFFER: usize = 64;

const DEFAULT_REASONING_EFFORT: &str = "medium";
const DEFAULT_VERBOSITY: &str = "medium";
const DEFAULT_SERVICE_TIER: &str = "auto";

/// Which system prompt a replay runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    Current,
    Edited,
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Current => "Current",
            Self::Edited => "Edited",
        })
    }
}

/// What the caller asks to simulate
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub scenario_id: String,
    pub model: String,
    pub current_prompt: String,
    pub edited_prompt: String,
    pub options: ModelOptions,
}

/// Payload of a `complete` event
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SimulationTranscript {
    pub title: String,
    /// Conversation without the system message
    pub messages: Vec<ChatMessage>,
}

/// Payload of a `message` event
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnMessage {
    pub turn_index: usize,
    #[serde(flatten)]
    pub message: ChatMessage,
    /// True when `content` is the failure sentinel
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

/// One frame of the simulation stream
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SimulationEvent {
    #[serde(rename_all = "camelCase")]
    Start {
        scenario_name: String,
        total_turns: usize,
    },
    #[serde(rename_all = "camelCase")]
    Message {
        prompt_type: PromptVariant,
        data: TurnMessage,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        prompt_type: PromptVariant,
        data: SimulationTranscript,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt_type: Option<PromptVariant>,
        error: String,
    },
    Done,
}

/// `"Simulation · Current Prompt · gpt-5 (reasoning: high)"`
pub fn simulation_title(variant: PromptVariant, model: &str, options: &ModelOptions) -> String {
    format!(
        "Simulation · {} Prompt · {}{}",
        variant,
        model,
        options_suffix(model, options)
    )
}

/// Non-default options in display form, empty when none apply
fn options_suffix(model: &str, options: &ModelOptions) -> String {
    if !ModelOptions::supported_by(model) {
        return String::new();
    }

    let non_default = |value: &Option<String>, default: &str| {
        value
            .as_deref()
            .filter(|v| !v.is_empty() && *v != default)
            .map(str::to_string)
    };
    let parts: Vec<String> = [
        ("reasoning", non_default(&options.reasoning_effort, DEFAULT_REASONING_EFFORT)),
        ("verbosity", non_default(&options.verbosity, DEFAULT_VERBOSITY)),
        ("tier", non_default(&options.service_tier, DEFAULT_SERVICE_TIER)),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v)))
    .collect();

    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

/// Loads and checks everything a simulation needs before streaming starts
#[derive(Clone)]
pub struct SimulationService {
    scenarios: ScenarioService,
    variables: VariableService,
    provider_keys: ProviderKeyService,
    llm: Arc<dyn LlmClient>,
}

impl SimulationService {
    pub fn new(
        scenarios: ScenarioService,
        variables: VariableService,
        provider_keys: ProviderKeyService,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            scenarios,
            variables,
            provider_keys,
            llm,
        }
    }

    /// Validate the request and load its inputs; every setup error surfaces
    /// here, before any event is produced
    pub async fn prepare(
        &self,
        ctx: &OrgContext,
        request: SimulationRequest,
    ) -> DomainResult<PreparedSimulation> {
        let model = request.model.trim().to_string();
        if model.is_empty() {
            return Err(DomainError::validation("Model is required"));
        }

        let api_key = self
            .provider_keys
            .active_key(&ctx.active_org_id, SIMULATION_PROVIDER)
            .await?
            .ok_or_else(|| {
                DomainError::precondition(
                    "NO_API_KEY",
                    "Add an OpenAI API key in settings before running simulations",
                )
            })?;

        let scenario = self.scenarios.get(ctx, &request.scenario_id).await?;
        let user_turns: Vec<String> = scenario.user_turns().map(str::to_string).collect();
        if user_turns.is_empty() {
            return Err(DomainError::precondition(
                "EMPTY_SCENARIO",
                "Scenario has no user turns to simulate",
            ));
        }

        let variables = self.variables.values(ctx).await?;

        Ok(PreparedSimulation {
            scenario_name: scenario.scenario.name,
            user_turns: Arc::new(user_turns),
            variables: Arc::new(variables),
            api_key: Arc::from(api_key),
            model: Arc::from(model),
            options: Arc::new(request.options),
            current_prompt: request.current_prompt,
            edited_prompt: request.edited_prompt,
            llm: Arc::clone(&self.llm),
        })
    }
}

/// Inputs of a validated simulation, ready to run
pub struct PreparedSimulation {
    scenario_name: String,
    user_turns: Arc<Vec<String>>,
    variables: Arc<HashMap<String, String>>,
    api_key: Arc<str>,
    model: Arc<str>,
    options: Arc<ModelOptions>,
    current_prompt: String,
    edited_prompt: String,
    llm: Arc<dyn LlmClient>,
}

impl PreparedSimulation {
    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    /// Spawn both replays; events arrive on the returned receiver
    ///
    /// Dropping the receiver stops the producers at their next send.
    pub fn start(self) -> mpsc::Receiver<SimulationEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(self.orchestrate(tx));
        rx
    }

    async fn orchestrate(self, tx: mpsc::Sender<SimulationEvent>) {
        let start = SimulationEvent::Start {
            scenario_name: self.scenario_name.clone(),
            total_turns: self.user_turns.len(),
        };
        if tx.send(start).await.is_err() {
            return;
        }

        let replays = [
            (PromptVariant::Current, self.current_prompt.clone()),
            (PromptVariant::Edited, self.edited_prompt.clone()),
        ]
        .map(|(variant, prompt)| {
            let replay = Replay {
                variant,
                system_prompt: prompt,
                user_turns: Arc::clone(&self.user_turns),
                variables: Arc::clone(&self.variables),
                api_key: Arc::clone(&self.api_key),
                model: Arc::clone(&self.model),
                options: Arc::clone(&self.options),
                llm: Arc::clone(&self.llm),
            };
            (variant, tokio::spawn(replay.run(tx.clone())))
        });

        for (variant, handle) in replays {
            if let Err(e) = handle.await {
                tracing::error!(variant = %variant, error = %e, "Simulation replay aborted");
                let event = SimulationEvent::Error {
                    prompt_type: Some(variant),
                    error: "Simulation failed unexpectedly".to_string(),
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }

        // receiver may already be gone
        let _ = tx.send(SimulationEvent::Done).await;
    }
}

/// One variant's conversation replay
struct Replay {
    variant: PromptVariant,
    system_prompt: String,
    user_turns: Arc<Vec<String>>,
    variables: Arc<HashMap<String, String>>,
    api_key: Arc<str>,
    model: Arc<str>,
    options: Arc<ModelOptions>,
    llm: Arc<dyn LlmClient>,
}

impl Replay {
    async fn run(self, tx: mpsc::Sender<SimulationEvent>) {
        let mut messages = Vec::with_capacity(self.user_turns.len() * 2 + 1);
        messages.push(ChatMessage::system(resolve_variables(
            &self.system_prompt,
            &self.variables,
        )));

        for (turn_index, text) in self.user_turns.iter().enumerate() {
            let user = ChatMessage::user(resolve_variables(text, &self.variables));
            messages.push(user.clone());
            if !self.emit(&tx, turn_index, user, false).await {
                return;
            }

            let request = ChatRequest {
                api_key: &self.api_key,
                model: &self.model,
                messages: &messages,
                options: &self.options,
            };
            let (reply, failed) = match self.llm.complete(&request).await {
                Ok(reply) => (reply, false),
                Err(e) => {
                    tracing::warn!(
                        variant = %self.variant,
                        turn = turn_index,
                        error = %e,
                        "Simulation turn failed"
                    );
                    (SIMULATION_ERROR_TEXT.to_string(), true)
                }
            };

            let assistant = ChatMessage::assistant(reply);
            messages.push(assistant.clone());
            if !self.emit(&tx, turn_index, assistant, failed).await {
                return;
            }
        }

        let transcript = SimulationTranscript {
            title: simulation_title(self.variant, &self.model, &self.options),
            messages: messages
                .into_iter()
                .filter(|m| m.role != ChatRole::System)
                .collect(),
        };
        let _ = tx
            .send(SimulationEvent::Complete {
                prompt_type: self.variant,
                data: transcript,
            })
            .await;
    }

    /// False once the client has gone away
    async fn emit(
        &self,
        tx: &mpsc::Sender<SimulationEvent>,
        turn_index: usize,
        message: ChatMessage,
        failed: bool,
    ) -> bool {
        let event = SimulationEvent::Message {
            prompt_type: self.variant,
            data: TurnMessage {
                turn_index,
                message,
                failed,
            },
        };
        if tx.send(event).await.is_err() {
            tracing::debug!(variant = %self.variant, "Simulation client disconnected");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::data::TransactionalService;
    use crate::data::types::{NewScenario, NewTurn, NewVariable, Role, TurnType};
    use crate::utils::encryption::EncryptionService;

    /// Echoes the last user message; fails whenever it is the second user turn
    #[derive(Default)]
    struct ScriptedClient {
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
            if let Ok(mut log) = self.requests.lock() {
                log.push(request.messages.to_vec());
            }
            let user_turns = request
                .messages
                .iter()
                .filter(|m| m.role == ChatRole::User)
                .count();
            if user_turns == 2 {
                return Err(LlmError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    struct Fixture {
        db: Arc<TransactionalService>,
        ctx: OrgContext,
        service: SimulationService,
        client: Arc<ScriptedClient>,
        provider_keys: ProviderKeyService,
    }

    async fn setup() -> Fixture {
        let db = Arc::new(TransactionalService::in_memory().await);
        let repo = db.repository();
        let user = repo.upsert_user("ada@example.com", None).await.unwrap();
        let org = repo
            .create_organization_with_admin("Ada", "ada", &user.id)
            .await
            .unwrap();
        let ctx = OrgContext::new(user.id, org.id, Role::Admin);

        let client = Arc::new(ScriptedClient::default());
        let provider_keys = ProviderKeyService::new(
            Arc::clone(&db),
            Some(EncryptionService::from_secret("simulation-secret")),
        );
        let service = SimulationService::new(
            ScenarioService::new(Arc::clone(&db)),
            VariableService::new(Arc::clone(&db)),
            provider_keys.clone(),
            Arc::clone(&client) as Arc<dyn LlmClient>,
        );
        Fixture {
            db,
            ctx,
            service,
            client,
            provider_keys,
        }
    }

    impl Fixture {
        async fn scenario(&self, turns: Vec<NewTurn>) -> String {
            self.db
                .repository()
                .create_scenario(
                    &self.ctx.active_org_id,
                    &self.ctx.user_id,
                    &NewScenario {
                        name: "Support".into(),
                        description: None,
                        turns,
                    },
                )
                .await
                .unwrap()
                .scenario
                .id
        }

        async fn add_key(&self) {
            self.provider_keys
                .upsert(&self.ctx, "openai", "sk-test-1234")
                .await
                .unwrap();
        }
    }

    fn user(text: &str) -> NewTurn {
        NewTurn {
            turn_type: TurnType::User,
            user_text: Some(text.to_string()),
            expectations: vec![],
        }
    }

    fn request(scenario_id: &str, model: &str) -> SimulationRequest {
        SimulationRequest {
            scenario_id: scenario_id.to_string(),
            model: model.to_string(),
            current_prompt: "Be {{tone}}.".to_string(),
            edited_prompt: "Be very {{tone}}.".to_string(),
            options: ModelOptions::default(),
        }
    }

    async fn collect(mut rx: mpsc::Receiver<SimulationEvent>) -> Vec<SimulationEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_title_and_options_suffix() {
        let defaults = ModelOptions::default();
        assert_eq!(
            simulation_title(PromptVariant::Current, "gpt-4o", &defaults),
            "Simulation · Current Prompt · gpt-4o"
        );

        let options = ModelOptions {
            reasoning_effort: Some("high".into()),
            verbosity: Some("low".into()),
            service_tier: Some("flex".into()),
        };
        assert_eq!(
            simulation_title(PromptVariant::Edited, "gpt-5", &options),
            "Simulation · Edited Prompt · gpt-5 (reasoning: high, verbosity: low, tier: flex)"
        );

        let defaults_spelled_out = ModelOptions {
            reasoning_effort: Some("medium".into()),
            verbosity: Some("medium".into()),
            service_tier: Some("auto".into()),
        };
        assert_eq!(options_suffix("gpt-5", &defaults_spelled_out), "");
        // options are ignored for models that do not take them
        assert_eq!(options_suffix("gpt-4o", &options), "");
    }

    #[test]
    fn test_event_wire_shape() {
        let event = SimulationEvent::Message {
            prompt_type: PromptVariant::Edited,
            data: TurnMessage {
                turn_index: 1,
                message: ChatMessage::assistant("hi"),
                failed: false,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["promptType"], "edited");
        assert_eq!(json["data"]["role"], "assistant");
        assert_eq!(json["data"]["turnIndex"], 1);
        assert!(json["data"].get("failed").is_none());

        let start = serde_json::to_value(SimulationEvent::Start {
            scenario_name: "S".into(),
            total_turns: 3,
        })
        .unwrap();
        assert_eq!(start["scenarioName"], "S");
        assert_eq!(start["totalTurns"], 3);
        assert_eq!(
            serde_json::to_value(SimulationEvent::Done).unwrap()["type"],
            "done"
        );
    }

    #[tokio::test]
    async fn test_failed_turn_is_isolated() {
        let f = setup().await;
        f.add_key().await;
        f.service
            .variables
            .create(
                &f.ctx,
                NewVariable {
                    key: "tone".into(),
                    value: "kind".into(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let scenario_id = f
            .scenario(vec![user("Hello {{tone}}"), user("Second"), user("Third {{missing}}")])
            .await;

        let prepared = f
            .service
            .prepare(&f.ctx, request(&scenario_id, "gpt-4o"))
            .await
            .unwrap();
        assert_eq!(prepared.scenario_name(), "Support");
        let events = collect(prepared.start()).await;

        assert_eq!(
            events.first(),
            Some(&SimulationEvent::Start {
                scenario_name: "Support".into(),
                total_turns: 3
            })
        );
        assert_eq!(events.last(), Some(&SimulationEvent::Done));

        for variant in [PromptVariant::Current, PromptVariant::Edited] {
            let messages: Vec<&TurnMessage> = events
                .iter()
                .filter_map(|e| match e {
                    SimulationEvent::Message { prompt_type, data } if *prompt_type == variant => {
                        Some(data)
                    }
                    _ => None,
                })
                .collect();
            assert_eq!(messages.len(), 6, "{variant}");

            // user message precedes its reply, in turn order
            assert_eq!(messages[0].message, ChatMessage::user("Hello kind"));
            assert_eq!(messages[1].message, ChatMessage::assistant("echo: Hello kind"));
            assert_eq!(messages[3].message, ChatMessage::assistant(SIMULATION_ERROR_TEXT));
            assert!(messages[3].failed);
            assert_eq!(messages[4].message, ChatMessage::user("Third {{missing}}"));
            assert_eq!(
                messages[5].message,
                ChatMessage::assistant("echo: Third {{missing}}")
            );

            let transcript = events
                .iter()
                .find_map(|e| match e {
                    SimulationEvent::Complete { prompt_type, data } if *prompt_type == variant => {
                        Some(data)
                    }
                    _ => None,
                })
                .unwrap();
            assert_eq!(transcript.messages.len(), 6);
            assert!(transcript.messages.iter().all(|m| m.role != ChatRole::System));
            assert_eq!(
                transcript.title,
                format!("Simulation · {} Prompt · gpt-4o", variant)
            );
        }

        let requests = f.client.requests.lock().unwrap();
        assert_eq!(requests.len(), 6);
        let systems: Vec<&str> = requests
            .iter()
            .filter(|r| r.len() == 2)
            .map(|r| r[0].content.as_str())
            .collect();
        assert!(systems.contains(&"Be kind."));
        assert!(systems.contains(&"Be very kind."));
        // the third call carries the sentinel from the failed turn
        assert!(
            requests
                .iter()
                .any(|r| r.len() == 6 && r[4].content == SIMULATION_ERROR_TEXT)
        );
    }

    #[tokio::test]
    async fn test_setup_errors_fail_before_streaming() {
        let f = setup().await;
        let scenario_id = f.scenario(vec![user("Hi")]).await;

        match f.service.prepare(&f.ctx, request(&scenario_id, "gpt-4o")).await {
            Err(DomainError::Precondition { code, .. }) => assert_eq!(code, "NO_API_KEY"),
            other => panic!("expected NO_API_KEY, got {:?}", other.err()),
        }

        f.add_key().await;
        assert!(matches!(
            f.service.prepare(&f.ctx, request("missing", "gpt-4o")).await,
            Err(DomainError::NotFound("Scenario"))
        ));
        assert!(matches!(
            f.service.prepare(&f.ctx, request(&scenario_id, "  ")).await,
            Err(DomainError::Validation(_))
        ));

        let expect_only = f
            .db
            .repository()
            .create_scenario(
                &f.ctx.active_org_id,
                &f.ctx.user_id,
                &NewScenario {
                    name: "Expect only".into(),
                    description: None,
                    turns: vec![NewTurn {
                        turn_type: TurnType::Expect,
                        user_text: None,
                        expectations: vec![],
                    }],
                },
            )
            .await
            .unwrap();
        match f
            .service
            .prepare(&f.ctx, request(&expect_only.scenario.id, "gpt-4o"))
            .await
        {
            Err(DomainError::Precondition { code, .. }) => assert_eq!(code, "EMPTY_SCENARIO"),
            other => panic!("expected EMPTY_SCENARIO, got {:?}", other.err()),
        }
        assert!(f.client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_request_starts_with_system_message() {
        let f = setup().await;
        f.add_key().await;
        let scenario_id = f.scenario(vec![user("Hi")]).await;

        let mut req = request(&scenario_id, "gpt-4o");
        req.edited_prompt = "   ".to_string();
        let prepared = f.service.prepare(&f.ctx, req).await.unwrap();
        let events = collect(prepared.start()).await;
        assert_eq!(events.len(), 8);

        let requests = f.client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r[0].role == ChatRole::System));
        assert!(requests.iter().any(|r| r[0].content == "   "));
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_producers() {
        let f = setup().await;
        f.add_key().await;
        let scenario_id = f.scenario(vec![user("a"), user("b"), user("c")]).await;

        let prepared = f
            .service
            .prepare(&f.ctx, request(&scenario_id, "gpt-4o"))
            .await
            .unwrap();
        let mut rx = prepared.start();
        assert!(matches!(rx.recv().await, Some(SimulationEvent::Start { .. })));
        drop(rx);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(f.client.requests.lock().unwrap().len() <= 2);
    }
}
