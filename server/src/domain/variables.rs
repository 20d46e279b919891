//! Organization variables and `{{key}}` substitution

use std::collections::HashMap;
use std::sync::Arc;

use super::error::{DomainError, DomainResult};
use super::org_context::OrgContext;
use crate::core::constants::VARIABLE_KEY_MAX_LEN;
use crate::data::TransactionalService;
use crate::data::types::{NewVariable, VariableRow, VariableUpdate};

/// Replace every `{{key}}` with its value; unknown keys stay literal
pub fn resolve_variables(text: &str, values: &HashMap<String, String>) -> String {
    use std::sync::OnceLock;

    static PLACEHOLDER: OnceLock<regex::Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| regex::Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("Invalid regex"));

    re.replace_all(text, |caps: &regex::Captures<'_>| match values.get(&caps[1]) {
        Some(value) => value.clone(),
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// Placeholder text that references `key`
pub fn placeholder(key: &str) -> String {
    format!("{{{{{}}}}}", key)
}

fn validate_key(key: &str) -> DomainResult<String> {
    let key = key.trim();
    if key.is_empty() || key.len() > VARIABLE_KEY_MAX_LEN {
        return Err(DomainError::validation(format!(
            "Variable key must be 1-{} characters",
            VARIABLE_KEY_MAX_LEN
        )));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DomainError::validation(
            "Variable key may only contain letters, digits and underscores",
        ));
    }
    Ok(key.to_string())
}

#[derive(Clone)]
pub struct VariableService {
    database: Arc<TransactionalService>,
}

impl VariableService {
    pub fn new(database: Arc<TransactionalService>) -> Self {
        Self { database }
    }

    pub async fn list(&self, ctx: &OrgContext) -> DomainResult<Vec<VariableRow>> {
        Ok(self
            .database
            .repository()
            .list_variables(&ctx.active_org_id)
            .await?)
    }

    /// Key to value map used for substitution
    pub async fn values(&self, ctx: &OrgContext) -> DomainResult<HashMap<String, String>> {
        Ok(self
            .list(ctx)
            .await?
            .into_iter()
            .map(|v| (v.key, v.value))
            .collect())
    }

    pub async fn get(&self, ctx: &OrgContext, id: &str) -> DomainResult<VariableRow> {
        self.database
            .repository()
            .get_variable(&ctx.active_org_id, id)
            .await?
            .ok_or(DomainError::NotFound("Variable"))
    }

    pub async fn create(&self, ctx: &OrgContext, mut variable: NewVariable) -> DomainResult<VariableRow> {
        variable.key = validate_key(&variable.key)?;
        let repo = self.database.repository();
        let org_id = &ctx.active_org_id;

        if repo.variable_key_exists(org_id, &variable.key, None).await? {
            return Err(duplicate_error(&variable.key));
        }
        repo.create_variable(org_id, &ctx.user_id, &variable)
            .await
            .map_err(|e| conflict_as_duplicate(e, &variable.key))
    }

    pub async fn update(
        &self,
        ctx: &OrgContext,
        id: &str,
        mut update: VariableUpdate,
    ) -> DomainResult<VariableRow> {
        let repo = self.database.repository();
        let org_id = &ctx.active_org_id;

        if let Some(key) = update.key.take() {
            let key = validate_key(&key)?;
            if repo.variable_key_exists(org_id, &key, Some(id)).await? {
                return Err(duplicate_error(&key));
            }
            update.key = Some(key);
        }

        let key = update.key.clone().unwrap_or_default();
        repo.update_variable(org_id, id, &update)
            .await
            .map_err(|e| conflict_as_duplicate(e, &key))?
            .ok_or(DomainError::NotFound("Variable"))
    }

    /// Delete unless some prompt or scenario turn still references `{{key}}`
    pub async fn delete(&self, ctx: &OrgContext, id: &str) -> DomainResult<()> {
        let variable = self.get(ctx, id).await?;
        let repo = self.database.repository();
        let org_id = &ctx.active_org_id;
        let needle = placeholder(&variable.key);

        let prompts = repo.find_prompts_containing(org_id, &needle).await?;
        let scenarios = repo.find_scenarios_with_text(org_id, &needle).await?;
        if !prompts.is_empty() || !scenarios.is_empty() {
            return Err(DomainError::InUse { prompts, scenarios });
        }

        if !repo.delete_variable(org_id, id).await? {
            return Err(DomainError::NotFound("Variable"));
        }
        Ok(())
    }
}

fn duplicate_error(key: &str) -> DomainError {
    DomainError::duplicate(format!("A variable with key '{}' already exists", key))
}

fn conflict_as_duplicate(e: crate::data::DataError, key: &str) -> DomainError {
    if e.is_conflict() {
        duplicate_error(key)
    } else {
        e.into()
    }
}
