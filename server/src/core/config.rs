use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_LLM_BASE_URL,
    DEFAULT_LLM_MAX_RETRIES, DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_SESSION_TTL_DAYS,
    MIN_ENCRYPTION_SECRET_LEN,
};

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Server configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Auth configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub enabled: Option<bool>,
    pub session_ttl_days: Option<u32>,
}

/// Security configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SecurityFileConfig {
    pub encryption_secret: Option<String>,
}

/// Feature flags section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FeaturesFileConfig {
    pub invitations: Option<bool>,
}

/// LLM provider section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LlmFileConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub security: Option<SecurityFileConfig>,
    pub features: Option<FeaturesFileConfig>,
    pub llm: Option<LlmFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            if auth.enabled.is_some() {
                tracing::trace!(enabled = ?auth.enabled, "Merging auth.enabled");
                current.enabled = auth.enabled;
            }
            if auth.session_ttl_days.is_some() {
                tracing::trace!(ttl = ?auth.session_ttl_days, "Merging auth.session_ttl_days");
                current.session_ttl_days = auth.session_ttl_days;
            }
        }

        if let Some(security) = other.security {
            let current = self.security.get_or_insert_with(SecurityFileConfig::default);
            if security.encryption_secret.is_some() {
                tracing::trace!("Merging security.encryption_secret");
                current.encryption_secret = security.encryption_secret;
            }
        }

        if let Some(features) = other.features {
            let current = self.features.get_or_insert_with(FeaturesFileConfig::default);
            if features.invitations.is_some() {
                tracing::trace!(invitations = ?features.invitations, "Merging features.invitations");
                current.invitations = features.invitations;
            }
        }

        if let Some(llm) = other.llm {
            let current = self.llm.get_or_insert_with(LlmFileConfig::default);
            if llm.base_url.is_some() {
                tracing::trace!(base_url = ?llm.base_url, "Merging llm.base_url");
                current.base_url = llm.base_url;
            }
            if llm.timeout_secs.is_some() {
                tracing::trace!(timeout_secs = ?llm.timeout_secs, "Merging llm.timeout_secs");
                current.timeout_secs = llm.timeout_secs;
            }
            if llm.max_retries.is_some() {
                tracing::trace!(max_retries = ?llm.max_retries, "Merging llm.max_retries");
                current.max_retries = llm.max_retries;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub session_ttl_days: u32,
    /// JWT signing secret; a random key is generated when absent
    pub session_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Provider key encryption secret; key storage is refused when absent
    pub encryption_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeaturesConfig {
    pub invitations_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub features: FeaturesConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.promptbench/promptbench.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_sources(cli, file_config)
    }

    /// Layer defaults -> file config -> CLI/env overrides
    pub(crate) fn from_sources(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_security = file_config.security.unwrap_or_default();
        let file_features = file_config.features.unwrap_or_default();
        let file_llm = file_config.llm.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        // --no-auth always wins over env/file
        let auth_enabled = if cli.no_auth {
            false
        } else {
            cli.auth_enabled.or(file_auth.enabled).unwrap_or(true)
        };

        let encryption_secret = cli
            .encryption_secret
            .clone()
            .or(file_security.encryption_secret)
            .filter(|s| !s.trim().is_empty());

        let config = Self {
            server: ServerConfig { host, port },
            auth: AuthConfig {
                enabled: auth_enabled,
                session_ttl_days: file_auth
                    .session_ttl_days
                    .unwrap_or(DEFAULT_SESSION_TTL_DAYS),
                session_secret: cli.session_secret.clone().filter(|s| !s.is_empty()),
            },
            security: SecurityConfig { encryption_secret },
            features: FeaturesConfig {
                invitations_enabled: cli
                    .invitations_enabled
                    .or(file_features.invitations)
                    .unwrap_or(true),
            },
            llm: LlmConfig {
                base_url: cli
                    .llm_base_url
                    .clone()
                    .or(file_llm.base_url)
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: cli
                    .llm_timeout_secs
                    .or(file_llm.timeout_secs)
                    .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
                max_retries: cli
                    .llm_max_retries
                    .or(file_llm.max_retries)
                    .unwrap_or(DEFAULT_LLM_MAX_RETRIES),
            },
        };

        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            auth_enabled = config.auth.enabled,
            session_ttl_days = config.auth.session_ttl_days,
            encryption_configured = config.security.encryption_secret.is_some(),
            invitations_enabled = config.features.invitations_enabled,
            llm_base_url = %config.llm.base_url,
            llm_timeout_secs = config.llm.timeout_secs,
            llm_max_retries = config.llm.max_retries,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.auth.session_ttl_days == 0 {
            anyhow::bail!("Configuration error: auth.session_ttl_days must be greater than 0");
        }

        if self.llm.base_url.is_empty() {
            anyhow::bail!("Configuration error: llm.base_url must not be empty");
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "Configuration error: llm.base_url must start with http:// or https://. Got: {}",
                self.llm.base_url
            );
        }

        if self.llm.timeout_secs == 0 {
            anyhow::bail!("Configuration error: llm.timeout_secs must be greater than 0");
        }

        match &self.security.encryption_secret {
            None => tracing::warn!(
                "No encryption secret configured; saving provider API keys will fail"
            ),
            Some(secret) if secret.len() < MIN_ENCRYPTION_SECRET_LEN => tracing::warn!(
                min_len = MIN_ENCRYPTION_SECRET_LEN,
                "Encryption secret is shorter than recommended"
            ),
            Some(_) => {}
        }

        if !self.auth.enabled && is_all_interfaces(&self.server.host) {
            tracing::warn!(
                host = %self.server.host,
                "Authentication is disabled while binding to all network interfaces. \
                 This exposes an unauthenticated server to your network."
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.promptbench/promptbench.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(cli: &CliConfig, json: &str) -> Result<AppConfig> {
        let file: FileConfig = serde_json::from_str(json).unwrap();
        AppConfig::from_sources(cli, file)
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "auth": { "enabled": false, "session_ttl_days": 7 },
            "security": { "encryption_secret": "0123456789abcdef" },
            "features": { "invitations": false },
            "llm": { "base_url": "http://localhost:11434/v1", "timeout_secs": 30 }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("0.0.0.0".to_string())
        );
        assert_eq!(config.auth.as_ref().unwrap().session_ttl_days, Some(7));
        assert_eq!(config.features.as_ref().unwrap().invitations, Some(false));
        assert_eq!(config.llm.as_ref().unwrap().timeout_secs, Some(30));
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "port": 9000 }, "sever": { "port": 1 } }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        let extra = config.extra.as_object().unwrap();
        assert!(extra.contains_key("sever"));
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{ "server": { "host": "a", "port": 1 }, "llm": { "max_retries": 3 } }"#,
        )
        .unwrap();
        let overlay: FileConfig =
            serde_json::from_str(r#"{ "server": { "port": 2 }, "features": { "invitations": false } }"#)
                .unwrap();
        base.merge(overlay);

        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("a"));
        assert_eq!(server.port, Some(2));
        assert_eq!(base.llm.unwrap().max_retries, Some(3));
        assert_eq!(base.features.unwrap().invitations, Some(false));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = build(&CliConfig::default(), "{}").unwrap();

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.auth.enabled);
        assert!(config.features.invitations_enabled);
        assert!(config.security.encryption_secret.is_none());
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.timeout_secs, DEFAULT_LLM_TIMEOUT_SECS);
        assert_eq!(config.llm.max_retries, DEFAULT_LLM_MAX_RETRIES);
    }

    #[test]
    fn test_app_config_cli_overrides_file() {
        let cli = CliConfig {
            port: Some(3000),
            invitations_enabled: Some(true),
            llm_base_url: Some("http://proxy.local/v1/".to_string()),
            ..Default::default()
        };
        let config = build(
            &cli,
            r#"{ "server": { "port": 8080 }, "features": { "invitations": false } }"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.features.invitations_enabled);
        assert_eq!(config.llm.base_url, "http://proxy.local/v1");
    }

    #[test]
    fn test_no_auth_beats_file() {
        let cli = CliConfig {
            no_auth: true,
            ..Default::default()
        };
        let config = build(&cli, r#"{ "auth": { "enabled": true } }"#).unwrap();
        assert!(!config.auth.enabled);
    }

    #[test]
    fn test_blank_encryption_secret_is_absent() {
        let cli = CliConfig {
            encryption_secret: Some("   ".to_string()),
            ..Default::default()
        };
        let config = build(&cli, "{}").unwrap();
        assert!(config.security.encryption_secret.is_none());
    }

    #[test]
    fn test_validation_server_port_zero() {
        let cli = CliConfig {
            port: Some(0),
            ..Default::default()
        };
        let err = build(&cli, "{}").unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validation_empty_host() {
        let err = build(&CliConfig::default(), r#"{ "server": { "host": "" } }"#).unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_validation_bad_llm_url() {
        let err = build(&CliConfig::default(), r#"{ "llm": { "base_url": "ftp://x" } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("llm.base_url"));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let err =
            build(&CliConfig::default(), r#"{ "llm": { "timeout_secs": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("llm.timeout_secs"));
    }

    #[test]
    fn test_is_all_interfaces() {
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(is_all_interfaces("::"));
        assert!(is_all_interfaces("[::]"));
        assert!(!is_all_interfaces("127.0.0.1"));
        assert!(!is_all_interfaces("localhost"));
    }
}
