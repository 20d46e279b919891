//! TransactionalRepository trait implementation for SQLite
//!
//! Thin delegation from the trait to the per-table repository functions,
//! converting `SqliteError` into `DataError` at the boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::TransactionalRepository;
use crate::data::types::{
    InvitationRow, LastAdminResult, MemberWithUser, MembershipRow, NewInvitation, NewPrompt,
    NewScenario, NewVariable, OrgWithRole, OrganizationRow, PromptFilter, PromptRow, PromptUpdate,
    ProviderKeyRow, ResourceRef, Role, ScenarioDetail, ScenarioSummaryRow, ScenarioUpdate,
    UserProfileRow, UserRow, VariableRow, VariableUpdate,
};

use super::SqliteService;
use super::repositories::{
    invitation, membership, organization, profile, prompt, provider_key, scenario, user, variable,
};

#[async_trait]
impl TransactionalRepository for Arc<SqliteService> {
    async fn ping(&self) -> Result<(), DataError> {
        sqlx::query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(DataError::Sqlite)
    }

    // ==================== User Operations ====================

    async fn upsert_user(&self, email: &str, name: Option<&str>) -> Result<UserRow, DataError> {
        user::upsert_user(self.pool(), email, name)
            .await
            .map_err(Into::into)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRow>, DataError> {
        user::get_user(self.pool(), id).await.map_err(Into::into)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, DataError> {
        user::get_by_email(self.pool(), email)
            .await
            .map_err(Into::into)
    }

    // ==================== Profile Operations ====================

    async fn ensure_profile(&self, user_id: &str) -> Result<(), DataError> {
        profile::ensure_profile(self.pool(), user_id)
            .await
            .map_err(Into::into)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfileRow>, DataError> {
        profile::get_profile(self.pool(), user_id)
            .await
            .map_err(Into::into)
    }

    async fn set_last_active_org(
        &self,
        user_id: &str,
        org_id: Option<&str>,
    ) -> Result<(), DataError> {
        profile::set_last_active_org(self.pool(), user_id, org_id)
            .await
            .map_err(Into::into)
    }

    // ==================== Organization Operations ====================

    async fn create_organization_with_admin(
        &self,
        name: &str,
        slug: &str,
        user_id: &str,
    ) -> Result<OrganizationRow, DataError> {
        organization::create_organization_with_admin(self.pool(), name, slug, user_id)
            .await
            .map_err(Into::into)
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, DataError> {
        organization::slug_exists(self.pool(), slug)
            .await
            .map_err(Into::into)
    }

    async fn get_organization(&self, id: &str) -> Result<Option<OrganizationRow>, DataError> {
        organization::get_organization(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn update_organization_name(
        &self,
        id: &str,
        name: &str,
    ) -> Result<Option<OrganizationRow>, DataError> {
        organization::update_name(self.pool(), id, name)
            .await
            .map_err(Into::into)
    }

    async fn delete_organization(&self, id: &str) -> Result<bool, DataError> {
        organization::delete_organization(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn list_orgs_for_user(&self, user_id: &str) -> Result<Vec<OrgWithRole>, DataError> {
        organization::list_for_user(self.pool(), user_id)
            .await
            .map_err(Into::into)
    }

    // ==================== Membership Operations ====================

    async fn get_membership(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<Option<MembershipRow>, DataError> {
        membership::get_membership(self.pool(), org_id, user_id)
            .await
            .map_err(Into::into)
    }

    async fn list_active_memberships(
        &self,
        user_id: &str,
    ) -> Result<Vec<MembershipRow>, DataError> {
        membership::list_active_for_user(self.pool(), user_id)
            .await
            .map_err(Into::into)
    }

    async fn list_members(&self, org_id: &str) -> Result<Vec<MemberWithUser>, DataError> {
        membership::list_members(self.pool(), org_id)
            .await
            .map_err(Into::into)
    }

    async fn get_member_with_user(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<Option<MemberWithUser>, DataError> {
        membership::get_member_with_user(self.pool(), org_id, user_id)
            .await
            .map_err(Into::into)
    }

    async fn count_active_admins(&self, org_id: &str) -> Result<i64, DataError> {
        membership::count_active_admins(self.pool(), org_id)
            .await
            .map_err(Into::into)
    }

    async fn is_active_member_email(&self, org_id: &str, email: &str) -> Result<bool, DataError> {
        membership::is_active_member_email(self.pool(), org_id, email)
            .await
            .map_err(Into::into)
    }

    async fn update_member_role(
        &self,
        org_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<LastAdminResult<MembershipRow>, DataError> {
        membership::update_role_guarded(self.pool(), org_id, user_id, role)
            .await
            .map_err(Into::into)
    }

    async fn remove_member(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<LastAdminResult<()>, DataError> {
        membership::remove_member_guarded(self.pool(), org_id, user_id)
            .await
            .map_err(Into::into)
    }

    // ==================== Invitation Operations ====================

    async fn create_invitation(
        &self,
        new: &NewInvitation<'_>,
    ) -> Result<InvitationRow, DataError> {
        invitation::create_invitation(self.pool(), new)
            .await
            .map_err(Into::into)
    }

    async fn get_invitation(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Option<InvitationRow>, DataError> {
        invitation::get_invitation(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn list_pending_invitations(
        &self,
        org_id: &str,
    ) -> Result<Vec<InvitationRow>, DataError> {
        invitation::list_pending(self.pool(), org_id)
            .await
            .map_err(Into::into)
    }

    async fn touch_invitation(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Option<InvitationRow>, DataError> {
        invitation::touch_pending(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn delete_pending_invitation(&self, org_id: &str, id: &str) -> Result<bool, DataError> {
        invitation::delete_pending(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn list_acceptable_invitations(
        &self,
        email: &str,
        now: i64,
    ) -> Result<Vec<InvitationRow>, DataError> {
        invitation::list_acceptable(self.pool(), email, now)
            .await
            .map_err(Into::into)
    }

    async fn accept_invitation(
        &self,
        inv: &InvitationRow,
        user_id: &str,
    ) -> Result<bool, DataError> {
        invitation::accept_invitation(self.pool(), inv, user_id)
            .await
            .map_err(Into::into)
    }

    // ==================== Prompt Operations ====================

    async fn list_prompts(
        &self,
        org_id: &str,
        filter: &PromptFilter,
    ) -> Result<Vec<PromptRow>, DataError> {
        prompt::list_prompts(self.pool(), org_id, filter)
            .await
            .map_err(Into::into)
    }

    async fn get_prompt(&self, org_id: &str, id: &str) -> Result<Option<PromptRow>, DataError> {
        prompt::get_prompt(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn prompt_name_exists(
        &self,
        org_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DataError> {
        prompt::name_exists(self.pool(), org_id, name, exclude_id)
            .await
            .map_err(Into::into)
    }

    async fn create_prompt(
        &self,
        org_id: &str,
        user_id: &str,
        new: &NewPrompt,
    ) -> Result<PromptRow, DataError> {
        prompt::create_prompt(self.pool(), org_id, user_id, new)
            .await
            .map_err(Into::into)
    }

    async fn update_prompt(
        &self,
        org_id: &str,
        id: &str,
        update: &PromptUpdate,
    ) -> Result<Option<PromptRow>, DataError> {
        prompt::update_prompt(self.pool(), org_id, id, update)
            .await
            .map_err(Into::into)
    }

    async fn delete_prompt(&self, org_id: &str, id: &str) -> Result<bool, DataError> {
        prompt::delete_prompt(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn find_prompts_containing(
        &self,
        org_id: &str,
        needle: &str,
    ) -> Result<Vec<ResourceRef>, DataError> {
        prompt::find_containing(self.pool(), org_id, needle)
            .await
            .map_err(Into::into)
    }

    // ==================== Scenario Operations ====================

    async fn list_scenarios(&self, org_id: &str) -> Result<Vec<ScenarioSummaryRow>, DataError> {
        scenario::list_scenarios(self.pool(), org_id)
            .await
            .map_err(Into::into)
    }

    async fn get_scenario_detail(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Option<ScenarioDetail>, DataError> {
        scenario::get_scenario_detail(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn scenario_name_exists(
        &self,
        org_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DataError> {
        scenario::name_exists(self.pool(), org_id, name, exclude_id)
            .await
            .map_err(Into::into)
    }

    async fn create_scenario(
        &self,
        org_id: &str,
        user_id: &str,
        new: &NewScenario,
    ) -> Result<ScenarioDetail, DataError> {
        scenario::create_scenario(self.pool(), org_id, user_id, new)
            .await
            .map_err(Into::into)
    }

    async fn update_scenario(
        &self,
        org_id: &str,
        id: &str,
        update: &ScenarioUpdate,
    ) -> Result<Option<ScenarioDetail>, DataError> {
        scenario::update_scenario(self.pool(), org_id, id, update)
            .await
            .map_err(Into::into)
    }

    async fn delete_scenario(&self, org_id: &str, id: &str) -> Result<bool, DataError> {
        scenario::delete_scenario(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn find_scenarios_with_text(
        &self,
        org_id: &str,
        needle: &str,
    ) -> Result<Vec<ResourceRef>, DataError> {
        scenario::find_with_turn_text(self.pool(), org_id, needle)
            .await
            .map_err(Into::into)
    }

    // ==================== Variable Operations ====================

    async fn list_variables(&self, org_id: &str) -> Result<Vec<VariableRow>, DataError> {
        variable::list_variables(self.pool(), org_id)
            .await
            .map_err(Into::into)
    }

    async fn get_variable(&self, org_id: &str, id: &str) -> Result<Option<VariableRow>, DataError> {
        variable::get_variable(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    async fn variable_key_exists(
        &self,
        org_id: &str,
        key: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DataError> {
        variable::key_exists(self.pool(), org_id, key, exclude_id)
            .await
            .map_err(Into::into)
    }

    async fn create_variable(
        &self,
        org_id: &str,
        user_id: &str,
        new: &NewVariable,
    ) -> Result<VariableRow, DataError> {
        variable::create_variable(self.pool(), org_id, user_id, new)
            .await
            .map_err(Into::into)
    }

    async fn update_variable(
        &self,
        org_id: &str,
        id: &str,
        update: &VariableUpdate,
    ) -> Result<Option<VariableRow>, DataError> {
        variable::update_variable(self.pool(), org_id, id, update)
            .await
            .map_err(Into::into)
    }

    async fn delete_variable(&self, org_id: &str, id: &str) -> Result<bool, DataError> {
        variable::delete_variable(self.pool(), org_id, id)
            .await
            .map_err(Into::into)
    }

    // ==================== Provider Key Operations ====================

    async fn list_provider_keys(&self, org_id: &str) -> Result<Vec<ProviderKeyRow>, DataError> {
        provider_key::list_keys(self.pool(), org_id)
            .await
            .map_err(Into::into)
    }

    async fn upsert_provider_key(
        &self,
        org_id: &str,
        user_id: &str,
        provider: &str,
        encrypted_key: &str,
        key_hint: &str,
    ) -> Result<ProviderKeyRow, DataError> {
        provider_key::upsert_key(self.pool(), org_id, user_id, provider, encrypted_key, key_hint)
            .await
            .map_err(Into::into)
    }

    async fn get_active_provider_key(
        &self,
        org_id: &str,
        provider: &str,
    ) -> Result<Option<ProviderKeyRow>, DataError> {
        provider_key::get_active_key(self.pool(), org_id, provider)
            .await
            .map_err(Into::into)
    }

    async fn deactivate_provider_key(
        &self,
        org_id: &str,
        provider: &str,
    ) -> Result<bool, DataError> {
        provider_key::deactivate_key(self.pool(), org_id, provider)
            .await
            .map_err(Into::into)
    }
}
