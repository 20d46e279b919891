//! Conversation scenarios and their expectations
//!
//! A scenario is an ordered list of turns. USER turns are replayed against
//! the model during simulation; EXPECT turns carry assertions that can be
//! checked against a model reply with [`Expectation::evaluate`].

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use super::error::{DomainError, DomainResult};
use super::naming::{duplicate_on_conflict, free_copy_name, validate_name};
use super::org_context::OrgContext;
use crate::data::TransactionalService;
use crate::data::types::{
    Expectation, NewScenario, NewTurn, RegexArgs, ScenarioDetail, ScenarioSummaryRow,
    ScenarioUpdate, TextMatchArgs, TurnType,
};

impl Expectation {
    /// Check the assertion against a model reply
    ///
    /// A pattern that fails to compile never matches.
    pub fn evaluate(&self, output: &str) -> bool {
        match self {
            Self::MustContain(args) => text_matches(args, output),
            Self::MustNotContain(args) => !text_matches(args, output),
            Self::Regex(args) => build_regex(args).is_ok_and(|re| re.is_match(output)),
        }
    }

    /// Reject empty text and patterns that do not compile
    pub fn validate(&self) -> DomainResult<()> {
        match self {
            Self::MustContain(args) | Self::MustNotContain(args) => {
                if args.text.trim().is_empty() {
                    return Err(DomainError::validation(format!(
                        "{} expectation requires non-empty text",
                        self.type_str()
                    )));
                }
                Ok(())
            }
            Self::Regex(args) => build_regex(args)
                .map(|_| ())
                .map_err(DomainError::validation),
        }
    }
}

fn text_matches(args: &TextMatchArgs, output: &str) -> bool {
    if args.case_sensitive {
        output.contains(&args.text)
    } else {
        output.to_lowercase().contains(&args.text.to_lowercase())
    }
}

/// Compile with `i`, `m` and `s` flags; `g` and `u` are accepted and ignored
fn build_regex(args: &RegexArgs) -> Result<Regex, String> {
    if args.pattern.is_empty() {
        return Err("REGEX expectation requires a pattern".to_string());
    }

    let mut builder = RegexBuilder::new(&args.pattern);
    for flag in args.flags.as_deref().unwrap_or_default().chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'g' | 'u' => &mut builder,
            other => return Err(format!("Unsupported regex flag '{}'", other)),
        };
    }
    builder
        .build()
        .map_err(|e| format!("Invalid regex pattern: {}", e))
}

/// USER turns need text; every expectation must validate
fn validate_turns(turns: &[NewTurn]) -> DomainResult<()> {
    for (index, turn) in turns.iter().enumerate() {
        if turn.turn_type == TurnType::User
            && turn.user_text.as_deref().is_none_or(|t| t.trim().is_empty())
        {
            return Err(DomainError::validation(format!(
                "Turn {} is a USER turn without text",
                index + 1
            )));
        }
        for expectation in &turn.expectations {
            expectation.validate()?;
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct ScenarioService {
    database: Arc<TransactionalService>,
}

impl ScenarioService {
    pub fn new(database: Arc<TransactionalService>) -> Self {
        Self { database }
    }

    pub async fn list(&self, ctx: &OrgContext) -> DomainResult<Vec<ScenarioSummaryRow>> {
        Ok(self
            .database
            .repository()
            .list_scenarios(&ctx.active_org_id)
            .await?)
    }

    pub async fn get(&self, ctx: &OrgContext, id: &str) -> DomainResult<ScenarioDetail> {
        self.database
            .repository()
            .get_scenario_detail(&ctx.active_org_id, id)
            .await?
            .ok_or(DomainError::NotFound("Scenario"))
    }

    pub async fn create(
        &self,
        ctx: &OrgContext,
        mut scenario: NewScenario,
    ) -> DomainResult<ScenarioDetail> {
        scenario.name = validate_name("Scenario", &scenario.name)?;
        validate_turns(&scenario.turns)?;

        let repo = self.database.repository();
        let org_id = &ctx.active_org_id;
        if repo.scenario_name_exists(org_id, &scenario.name, None).await? {
            return Err(duplicate_error(&scenario.name));
        }

        let detail = repo
            .create_scenario(org_id, &ctx.user_id, &scenario)
            .await
            .map_err(duplicate_on_conflict("scenario", &scenario.name))?;
        tracing::debug!(
            org_id = %org_id,
            scenario_id = %detail.scenario.id,
            turns = detail.turns.len(),
            "Scenario created"
        );
        Ok(detail)
    }

    /// Update metadata; `turns` replaces the whole turn set. Bumps the version.
    pub async fn update(
        &self,
        ctx: &OrgContext,
        id: &str,
        mut update: ScenarioUpdate,
    ) -> DomainResult<ScenarioDetail> {
        let repo = self.database.repository();
        let org_id = &ctx.active_org_id;

        if let Some(name) = update.name.take() {
            let name = validate_name("Scenario", &name)?;
            if repo.scenario_name_exists(org_id, &name, Some(id)).await? {
                return Err(duplicate_error(&name));
            }
            update.name = Some(name);
        }
        if let Some(turns) = &update.turns {
            validate_turns(turns)?;
        }

        let conflict_name = update.name.clone().unwrap_or_default();
        repo.update_scenario(org_id, id, &update)
            .await
            .map_err(duplicate_on_conflict("scenario", &conflict_name))?
            .ok_or(DomainError::NotFound("Scenario"))
    }

    pub async fn delete(&self, ctx: &OrgContext, id: &str) -> DomainResult<()> {
        if !self
            .database
            .repository()
            .delete_scenario(&ctx.active_org_id, id)
            .await?
        {
            return Err(DomainError::NotFound("Scenario"));
        }
        Ok(())
    }

    /// Clone a scenario with its turns and expectations under a free copy name
    pub async fn duplicate(&self, ctx: &OrgContext, id: &str) -> DomainResult<ScenarioDetail> {
        let source = self.get(ctx, id).await?;
        let repo = self.database.repository();
        let repo = repo.as_ref();
        let org_id = ctx.active_org_id.as_str();

        let name = free_copy_name(&source.scenario.name, |candidate| async move {
            repo.scenario_name_exists(org_id, &candidate, None).await
        })
        .await?;

        let copy = NewScenario {
            name,
            description: source.scenario.description.clone(),
            turns: source.turns.iter().map(NewTurn::from).collect(),
        };
        repo.create_scenario(org_id, &ctx.user_id, &copy)
            .await
            .map_err(duplicate_on_conflict("scenario", &copy.name))
    }
}

fn duplicate_error(name: &str) -> DomainError {
    DomainError::duplicate(format!("A scenario named '{}' already exists", name))
}
