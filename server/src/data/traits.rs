//! Repository trait for the transactional store
//!
//! Domain services depend on this trait rather than on a concrete backend.
//! Every tenant-scoped method takes the organization id first and never
//! returns rows belonging to another organization.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{
    InvitationRow, LastAdminResult, MemberWithUser, MembershipRow, NewInvitation, NewPrompt,
    NewScenario, NewVariable, OrgWithRole, OrganizationRow, PromptFilter, PromptRow, PromptUpdate,
    ProviderKeyRow, ResourceRef, Role, ScenarioDetail, ScenarioSummaryRow, ScenarioUpdate,
    UserProfileRow, UserRow, VariableRow, VariableUpdate,
};

#[async_trait]
pub trait TransactionalRepository: Send + Sync {
    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> Result<(), DataError>;

    // ==================== User Operations ====================

    /// Insert a user keyed by (lower-cased) email, refreshing the name if present
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> Result<UserRow, DataError>;

    async fn get_user(&self, id: &str) -> Result<Option<UserRow>, DataError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, DataError>;

    // ==================== Profile Operations ====================

    /// Insert-or-ignore the user's profile row
    async fn ensure_profile(&self, user_id: &str) -> Result<(), DataError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfileRow>, DataError>;

    async fn set_last_active_org(
        &self,
        user_id: &str,
        org_id: Option<&str>,
    ) -> Result<(), DataError>;

    // ==================== Organization Operations ====================

    /// Create an organization and its ADMIN membership atomically
    ///
    /// A taken slug yields `DataError::Conflict`.
    async fn create_organization_with_admin(
        &self,
        name: &str,
        slug: &str,
        user_id: &str,
    ) -> Result<OrganizationRow, DataError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, DataError>;

    async fn get_organization(&self, id: &str) -> Result<Option<OrganizationRow>, DataError>;

    async fn update_organization_name(
        &self,
        id: &str,
        name: &str,
    ) -> Result<Option<OrganizationRow>, DataError>;

    /// Clear profile back-references and hard-delete the organization in one transaction
    async fn delete_organization(&self, id: &str) -> Result<bool, DataError>;

    /// Organizations with an ACTIVE membership for the user
    async fn list_orgs_for_user(&self, user_id: &str) -> Result<Vec<OrgWithRole>, DataError>;

    // ==================== Membership Operations ====================

    async fn get_membership(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<Option<MembershipRow>, DataError>;

    /// ACTIVE memberships ordered by `created_at`, then organization id
    async fn list_active_memberships(&self, user_id: &str)
    -> Result<Vec<MembershipRow>, DataError>;

    async fn list_members(&self, org_id: &str) -> Result<Vec<MemberWithUser>, DataError>;

    async fn get_member_with_user(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<Option<MemberWithUser>, DataError>;

    async fn count_active_admins(&self, org_id: &str) -> Result<i64, DataError>;

    async fn is_active_member_email(&self, org_id: &str, email: &str) -> Result<bool, DataError>;

    /// Change a role, refusing to demote the last ACTIVE ADMIN
    async fn update_member_role(
        &self,
        org_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<LastAdminResult<MembershipRow>, DataError>;

    /// Soft-remove a member, refusing to remove the last ACTIVE ADMIN
    async fn remove_member(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<LastAdminResult<()>, DataError>;

    // ==================== Invitation Operations ====================

    async fn create_invitation(
        &self,
        invitation: &NewInvitation<'_>,
    ) -> Result<InvitationRow, DataError>;

    async fn get_invitation(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Option<InvitationRow>, DataError>;

    async fn list_pending_invitations(&self, org_id: &str)
    -> Result<Vec<InvitationRow>, DataError>;

    /// Touch `updated_at` of a PENDING invitation
    async fn touch_invitation(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Option<InvitationRow>, DataError>;

    async fn delete_pending_invitation(&self, org_id: &str, id: &str) -> Result<bool, DataError>;

    /// PENDING invitations for `email` that expire after `now`
    async fn list_acceptable_invitations(
        &self,
        email: &str,
        now: i64,
    ) -> Result<Vec<InvitationRow>, DataError>;

    /// Accept atomically; `false` when the invitation was no longer PENDING
    async fn accept_invitation(
        &self,
        invitation: &InvitationRow,
        user_id: &str,
    ) -> Result<bool, DataError>;

    // ==================== Prompt Operations ====================

    async fn list_prompts(
        &self,
        org_id: &str,
        filter: &PromptFilter,
    ) -> Result<Vec<PromptRow>, DataError>;

    async fn get_prompt(&self, org_id: &str, id: &str) -> Result<Option<PromptRow>, DataError>;

    async fn prompt_name_exists(
        &self,
        org_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DataError>;

    async fn create_prompt(
        &self,
        org_id: &str,
        user_id: &str,
        prompt: &NewPrompt,
    ) -> Result<PromptRow, DataError>;

    async fn update_prompt(
        &self,
        org_id: &str,
        id: &str,
        update: &PromptUpdate,
    ) -> Result<Option<PromptRow>, DataError>;

    async fn delete_prompt(&self, org_id: &str, id: &str) -> Result<bool, DataError>;

    /// Prompts whose content contains `needle`
    async fn find_prompts_containing(
        &self,
        org_id: &str,
        needle: &str,
    ) -> Result<Vec<ResourceRef>, DataError>;

    // ==================== Scenario Operations ====================

    async fn list_scenarios(&self, org_id: &str) -> Result<Vec<ScenarioSummaryRow>, DataError>;

    async fn get_scenario_detail(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Option<ScenarioDetail>, DataError>;

    async fn scenario_name_exists(
        &self,
        org_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DataError>;

    async fn create_scenario(
        &self,
        org_id: &str,
        user_id: &str,
        scenario: &NewScenario,
    ) -> Result<ScenarioDetail, DataError>;

    /// Update metadata and optionally replace the turn set; bumps `version`
    async fn update_scenario(
        &self,
        org_id: &str,
        id: &str,
        update: &ScenarioUpdate,
    ) -> Result<Option<ScenarioDetail>, DataError>;

    async fn delete_scenario(&self, org_id: &str, id: &str) -> Result<bool, DataError>;

    /// Scenarios with a turn whose user text contains `needle`
    async fn find_scenarios_with_text(
        &self,
        org_id: &str,
        needle: &str,
    ) -> Result<Vec<ResourceRef>, DataError>;

    // ==================== Variable Operations ====================

    async fn list_variables(&self, org_id: &str) -> Result<Vec<VariableRow>, DataError>;

    async fn get_variable(&self, org_id: &str, id: &str) -> Result<Option<VariableRow>, DataError>;

    async fn variable_key_exists(
        &self,
        org_id: &str,
        key: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DataError>;

    async fn create_variable(
        &self,
        org_id: &str,
        user_id: &str,
        variable: &NewVariable,
    ) -> Result<VariableRow, DataError>;

    async fn update_variable(
        &self,
        org_id: &str,
        id: &str,
        update: &VariableUpdate,
    ) -> Result<Option<VariableRow>, DataError>;

    async fn delete_variable(&self, org_id: &str, id: &str) -> Result<bool, DataError>;

    // ==================== Provider Key Operations ====================

    async fn list_provider_keys(&self, org_id: &str) -> Result<Vec<ProviderKeyRow>, DataError>;

    /// Insert or replace the encrypted key for `(org, provider)` and activate it
    async fn upsert_provider_key(
        &self,
        org_id: &str,
        user_id: &str,
        provider: &str,
        encrypted_key: &str,
        key_hint: &str,
    ) -> Result<ProviderKeyRow, DataError>;

    async fn get_active_provider_key(
        &self,
        org_id: &str,
        provider: &str,
    ) -> Result<Option<ProviderKeyRow>, DataError>;

    async fn deactivate_provider_key(&self, org_id: &str, provider: &str)
    -> Result<bool, DataError>;
}
