//! Per-organization LLM provider API keys, encrypted at rest
//!
//! Plaintext keys only exist transiently: on upsert before encryption and
//! when a simulation decrypts the active key. Listings expose the last four
//! characters.

use std::sync::Arc;

use serde::Serialize;

use super::error::{DomainError, DomainResult};
use super::org_context::OrgContext;
use crate::data::TransactionalService;
use crate::data::types::ProviderKeyRow;
use crate::utils::encryption::{EncryptionError, EncryptionService};
use crate::utils::string::key_hint;

const PROVIDER_MAX_LEN: usize = 50;

/// Key metadata safe to return to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderKeySummary {
    pub provider: String,
    pub key_hint: String,
    pub masked_key: String,
    pub is_active: bool,
    pub updated_at: i64,
}

impl From<ProviderKeyRow> for ProviderKeySummary {
    fn from(row: ProviderKeyRow) -> Self {
        Self {
            masked_key: format!("****{}", row.key_hint),
            provider: row.provider,
            key_hint: row.key_hint,
            is_active: row.is_active,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct ProviderKeyService {
    database: Arc<TransactionalService>,
    encryption: Option<EncryptionService>,
}

impl ProviderKeyService {
    /// `encryption` is `None` when no server secret is configured
    pub fn new(database: Arc<TransactionalService>, encryption: Option<EncryptionService>) -> Self {
        Self {
            database,
            encryption,
        }
    }

    fn encryption(&self) -> DomainResult<&EncryptionService> {
        self.encryption.as_ref().ok_or_else(|| {
            DomainError::Misconfigured("encryption secret is not configured".to_string())
        })
    }

    pub async fn list(&self, ctx: &OrgContext) -> DomainResult<Vec<ProviderKeySummary>> {
        Ok(self
            .database
            .repository()
            .list_provider_keys(&ctx.active_org_id)
            .await?
            .into_iter()
            .map(ProviderKeySummary::from)
            .collect())
    }

    /// Store (or replace) the organization's key for `provider` and activate it
    pub async fn upsert(
        &self,
        ctx: &OrgContext,
        provider: &str,
        api_key: &str,
    ) -> DomainResult<ProviderKeySummary> {
        let provider = normalize_provider(provider)?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(DomainError::validation("API key is required"));
        }

        let encrypted = self.encryption()?.encrypt(api_key).map_err(crypto_error)?;
        let row = self
            .database
            .repository()
            .upsert_provider_key(
                &ctx.active_org_id,
                &ctx.user_id,
                &provider,
                &encrypted,
                &key_hint(api_key),
            )
            .await?;

        tracing::info!(org_id = %ctx.active_org_id, provider = %provider, "Provider key saved");
        Ok(row.into())
    }

    pub async fn deactivate(&self, ctx: &OrgContext, provider: &str) -> DomainResult<()> {
        let provider = normalize_provider(provider)?;
        if !self
            .database
            .repository()
            .deactivate_provider_key(&ctx.active_org_id, &provider)
            .await?
        {
            return Err(DomainError::NotFound("API key"));
        }
        tracing::info!(org_id = %ctx.active_org_id, provider = %provider, "Provider key deactivated");
        Ok(())
    }

    /// Decrypted active key for `provider`, if one is stored
    pub async fn active_key(&self, org_id: &str, provider: &str) -> DomainResult<Option<String>> {
        let Some(row) = self
            .database
            .repository()
            .get_active_provider_key(org_id, provider)
            .await?
        else {
            return Ok(None);
        };
        let plaintext = self
            .encryption()?
            .decrypt(&row.encrypted_key)
            .map_err(crypto_error)?;
        Ok(Some(plaintext))
    }
}

fn normalize_provider(provider: &str) -> DomainResult<String> {
    let provider = provider.trim().to_ascii_lowercase();
    let well_formed = !provider.is_empty()
        && provider.len() <= PROVIDER_MAX_LEN
        && provider
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !well_formed {
        return Err(DomainError::validation("Invalid provider name"));
    }
    Ok(provider)
}

fn crypto_error(e: EncryptionError) -> DomainError {
    tracing::error!(error = %e, "Provider key encryption failure");
    DomainError::Misconfigured(e.to_string())
}
