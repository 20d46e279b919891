//! Prompt library, scoped to the active organization

use std::sync::Arc;

use super::error::{DomainError, DomainResult};
use super::naming::{duplicate_on_conflict, free_copy_name, validate_name};
use super::org_context::OrgContext;
use crate::data::TransactionalService;
use crate::data::types::{NewPrompt, PromptFilter, PromptRow, PromptStatus, PromptUpdate};

#[derive(Clone)]
pub struct PromptService {
    database: Arc<TransactionalService>,
}

impl PromptService {
    pub fn new(database: Arc<TransactionalService>) -> Self {
        Self { database }
    }

    pub async fn list(&self, ctx: &OrgContext, filter: &PromptFilter) -> DomainResult<Vec<PromptRow>> {
        Ok(self
            .database
            .repository()
            .list_prompts(&ctx.active_org_id, filter)
            .await?)
    }

    pub async fn get(&self, ctx: &OrgContext, id: &str) -> DomainResult<PromptRow> {
        self.database
            .repository()
            .get_prompt(&ctx.active_org_id, id)
            .await?
            .ok_or(DomainError::NotFound("Prompt"))
    }

    pub async fn create(&self, ctx: &OrgContext, mut prompt: NewPrompt) -> DomainResult<PromptRow> {
        prompt.name = validate_name("Prompt", &prompt.name)?;
        let repo = self.database.repository();
        let org_id = &ctx.active_org_id;

        if repo.prompt_name_exists(org_id, &prompt.name, None).await? {
            return Err(duplicate_error(&prompt.name));
        }

        let row = repo
            .create_prompt(org_id, &ctx.user_id, &prompt)
            .await
            .map_err(duplicate_on_conflict("prompt", &prompt.name))?;
        tracing::debug!(org_id = %org_id, prompt_id = %row.id, "Prompt created");
        Ok(row)
    }

    pub async fn update(
        &self,
        ctx: &OrgContext,
        id: &str,
        mut update: PromptUpdate,
    ) -> DomainResult<PromptRow> {
        let repo = self.database.repository();
        let org_id = &ctx.active_org_id;

        if let Some(name) = update.name.take() {
            let name = validate_name("Prompt", &name)?;
            if repo.prompt_name_exists(org_id, &name, Some(id)).await? {
                return Err(duplicate_error(&name));
            }
            update.name = Some(name);
        }

        let conflict_name = update.name.clone().unwrap_or_default();
        repo.update_prompt(org_id, id, &update)
            .await
            .map_err(duplicate_on_conflict("prompt", &conflict_name))?
            .ok_or(DomainError::NotFound("Prompt"))
    }

    pub async fn delete(&self, ctx: &OrgContext, id: &str) -> DomainResult<()> {
        if !self
            .database
            .repository()
            .delete_prompt(&ctx.active_org_id, id)
            .await?
        {
            return Err(DomainError::NotFound("Prompt"));
        }
        tracing::debug!(org_id = %ctx.active_org_id, prompt_id = id, "Prompt deleted");
        Ok(())
    }

    /// Copy a prompt under the first free "(Copy N)" name; the copy is always DRAFT
    pub async fn duplicate(&self, ctx: &OrgContext, id: &str) -> DomainResult<PromptRow> {
        let source = self.get(ctx, id).await?;
        let repo = self.database.repository();
        let repo = repo.as_ref();
        let org_id = ctx.active_org_id.as_str();

        let name = free_copy_name(&source.name, |candidate| async move {
            repo.prompt_name_exists(org_id, &candidate, None).await
        })
        .await?;

        let copy = NewPrompt {
            name,
            description: source.description,
            content: source.content,
            status: PromptStatus::Draft,
        };
        repo.create_prompt(org_id, &ctx.user_id, &copy)
            .await
            .map_err(duplicate_on_conflict("prompt", &copy.name))
    }
}

fn duplicate_error(name: &str) -> DomainError {
    DomainError::duplicate(format!("A prompt named '{}' already exists", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::Role;

    async fn setup() -> (PromptService, OrgContext, OrgContext) {
        let db = Arc::new(TransactionalService::in_memory().await);
        let repo = db.repository();
        let mut contexts = Vec::new();
        for (email, slug) in [("ada@example.com", "ada"), ("bob@example.com", "bob")] {
            let user = repo.upsert_user(email, None).await.unwrap();
            let org = repo
                .create_organization_with_admin(slug, slug, &user.id)
                .await
                .unwrap();
            contexts.push(OrgContext::new(user.id, org.id, Role::Admin));
        }
        let bob = contexts.pop().unwrap();
        let ada = contexts.pop().unwrap();
        (PromptService::new(db), ada, bob)
    }

    fn new_prompt(name: &str, status: PromptStatus) -> NewPrompt {
        NewPrompt {
            name: name.to_string(),
            description: Some("desc".to_string()),
            content: "You are helpful. {{tone}}".to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let (service, ada, _) = setup().await;

        let created = service
            .create(&ada, new_prompt("  Greeter ", PromptStatus::Published))
            .await
            .unwrap();
        assert_eq!(created.name, "Greeter");
        assert_eq!(created.user_id, ada.user_id);

        let updated = service
            .update(
                &ada,
                &created.id,
                PromptUpdate {
                    content: Some("new".to_string()),
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.content, "new");
        assert_eq!(updated.name, "Greeter");
        assert!(updated.description.is_none());

        service.delete(&ada, &created.id).await.unwrap();
        assert!(matches!(
            service.get(&ada, &created.id).await,
            Err(DomainError::NotFound("Prompt"))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected_excluding_self() {
        let (service, ada, _) = setup().await;
        let a = service.create(&ada, new_prompt("A", PromptStatus::Draft)).await.unwrap();
        service.create(&ada, new_prompt("B", PromptStatus::Draft)).await.unwrap();

        assert!(matches!(
            service.create(&ada, new_prompt("A", PromptStatus::Draft)).await,
            Err(DomainError::Duplicate(_))
        ));
        assert!(matches!(
            service
                .update(&ada, &a.id, PromptUpdate { name: Some("B".into()), ..Default::default() })
                .await,
            Err(DomainError::Duplicate(_))
        ));
        // renaming to its own name is fine
        service
            .update(&ada, &a.id, PromptUpdate { name: Some("A".into()), ..Default::default() })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_probes_names_and_forces_draft() {
        let (service, ada, _) = setup().await;
        let source = service
            .create(&ada, new_prompt("Greeter", PromptStatus::Published))
            .await
            .unwrap();

        let first = service.duplicate(&ada, &source.id).await.unwrap();
        let second = service.duplicate(&ada, &source.id).await.unwrap();
        let third = service.duplicate(&ada, &source.id).await.unwrap();

        assert_eq!(first.name, "Greeter (Copy)");
        assert_eq!(second.name, "Greeter (Copy 2)");
        assert_eq!(third.name, "Greeter (Copy 3)");
        assert_eq!(first.status, PromptStatus::Draft);
        assert_eq!(first.content, source.content);
        assert_ne!(first.id, source.id);
    }

    #[tokio::test]
    async fn test_org_isolation() {
        let (service, ada, bob) = setup().await;
        let prompt = service.create(&ada, new_prompt("Secret", PromptStatus::Draft)).await.unwrap();

        assert!(matches!(
            service.get(&bob, &prompt.id).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(service.list(&bob, &PromptFilter::default()).await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&bob, &prompt.id).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            service.duplicate(&bob, &prompt.id).await,
            Err(DomainError::NotFound(_))
        ));
        // same name is free in another org
        service.create(&bob, new_prompt("Secret", PromptStatus::Draft)).await.unwrap();
        assert_eq!(service.list(&ada, &PromptFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (service, ada, _) = setup().await;
        service.create(&ada, new_prompt("Alpha", PromptStatus::Draft)).await.unwrap();
        service.create(&ada, new_prompt("Beta", PromptStatus::Published)).await.unwrap();

        let published = service
            .list(
                &ada,
                &PromptFilter {
                    status: Some(PromptStatus::Published),
                    search: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].name, "Beta");

        let searched = service
            .list(
                &ada,
                &PromptFilter {
                    status: None,
                    search: Some("alp".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].name, "Alpha");
    }
}
