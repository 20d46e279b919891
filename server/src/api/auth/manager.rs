//! Authentication manager

use anyhow::Result;

use super::jwt::{JwtError, SessionClaims, create_session_token, validate_session_token};
use crate::core::config::AuthConfig;
use crate::utils::crypto;

/// Session signing and bootstrap token verification
#[derive(Debug)]
pub struct AuthManager {
    signing_key: Vec<u8>,
    bootstrap_token: String,
    enabled: bool,
    session_ttl_days: u32,
}

impl AuthManager {
    /// Derive the signing key from the configured secret, or generate an
    /// ephemeral one (sessions then do not survive a restart)
    pub fn new(config: &AuthConfig) -> Self {
        let signing_key = match config.session_secret.as_deref() {
            Some(secret) => crypto::sha256(secret.as_bytes()).to_vec(),
            None => {
                if config.enabled {
                    tracing::warn!("No session secret configured, sessions end on restart");
                }
                crypto::generate_key(32)
            }
        };

        if config.enabled {
            tracing::debug!("Authentication enabled");
        } else {
            tracing::warn!("Authentication DISABLED");
        }

        Self {
            signing_key,
            bootstrap_token: crypto::generate_token(32),
            enabled: config.enabled,
            session_ttl_days: config.session_ttl_days,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bootstrap_token(&self) -> &str {
        &self.bootstrap_token
    }

    pub fn session_ttl_days(&self) -> u32 {
        self.session_ttl_days
    }

    pub fn verify_bootstrap(&self, token: &str) -> bool {
        crypto::constant_time_eq(&self.bootstrap_token, token)
    }

    /// Sign a session for `user_id`
    pub fn issue_session(&self, user_id: &str, auth_method: &str) -> Result<String> {
        create_session_token(&self.signing_key, user_id, auth_method, self.session_ttl_days)
    }

    pub fn validate_session(&self, jwt: &str) -> Result<SessionClaims, JwtError> {
        validate_session_token(jwt, &self.signing_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: Option<&str>) -> AuthConfig {
        AuthConfig {
            enabled: true,
            session_ttl_days: 7,
            session_secret: secret.map(String::from),
        }
    }

    #[test]
    fn test_bootstrap_verification() {
        let manager = AuthManager::new(&config(None));
        let token = manager.bootstrap_token().to_string();
        assert!(manager.verify_bootstrap(&token));
        assert!(!manager.verify_bootstrap("wrong"));
    }

    #[test]
    fn test_configured_secret_is_stable_across_instances() {
        let a = AuthManager::new(&config(Some("a-long-session-secret")));
        let b = AuthManager::new(&config(Some("a-long-session-secret")));
        let jwt = a.issue_session("user-1", "bootstrap").unwrap();
        assert_eq!(b.validate_session(&jwt).unwrap().user_id(), "user-1");
    }

    #[test]
    fn test_ephemeral_keys_differ() {
        let a = AuthManager::new(&config(None));
        let b = AuthManager::new(&config(None));
        let jwt = a.issue_session("user-1", "bootstrap").unwrap();
        assert!(b.validate_session(&jwt).is_err());
    }
}
