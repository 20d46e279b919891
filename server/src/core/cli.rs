use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_AUTH_ENABLED, ENV_CONFIG, ENV_DATA_DIR, ENV_ENCRYPTION_SECRET, ENV_HOST,
    ENV_INVITATIONS_ENABLED, ENV_LLM_BASE_URL, ENV_LLM_MAX_RETRIES, ENV_LLM_TIMEOUT_SECS, ENV_LOG,
    ENV_PORT, ENV_SESSION_SECRET,
};

#[derive(Parser)]
#[command(name = "promptbench")]
#[command(version, about = "Prompt testing workbench", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Disable authentication (single local user, for development)
    #[arg(long, global = true)]
    pub no_auth: bool,

    /// Enable or disable session authentication
    #[arg(long, global = true, env = ENV_AUTH_ENABLED)]
    pub auth_enabled: Option<bool>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Data directory (database lives under `sqlite/`)
    #[arg(long, global = true, env = ENV_DATA_DIR)]
    pub data_dir: Option<String>,

    /// Log filter, e.g. `debug` or `info,promptbench_server=trace`
    #[arg(long, global = true, env = ENV_LOG)]
    pub log: Option<String>,

    /// Secret used to sign session tokens (random per process when unset)
    #[arg(long, global = true, env = ENV_SESSION_SECRET, hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Secret used to encrypt stored provider API keys
    #[arg(long, global = true, env = ENV_ENCRYPTION_SECRET, hide_env_values = true)]
    pub encryption_secret: Option<String>,

    /// Allow creating organization invitations
    #[arg(long, global = true, env = ENV_INVITATIONS_ENABLED)]
    pub invitations_enabled: Option<bool>,

    /// OpenAI-compatible API base URL
    #[arg(long, global = true, env = ENV_LLM_BASE_URL)]
    pub llm_base_url: Option<String>,

    /// Per-call LLM timeout in seconds
    #[arg(long, global = true, env = ENV_LLM_TIMEOUT_SECS)]
    pub llm_timeout_secs: Option<u64>,

    /// Retries after the first failed LLM call
    #[arg(long, global = true, env = ENV_LLM_MAX_RETRIES)]
    pub llm_max_retries: Option<u32>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SystemCommands {
    /// Delete local data directory (database). Requires confirmation.
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_auth: bool,
    pub auth_enabled: Option<bool>,
    pub config: Option<PathBuf>,
    pub data_dir: Option<String>,
    pub log: Option<String>,
    pub session_secret: Option<String>,
    pub encryption_secret: Option<String>,
    pub invitations_enabled: Option<bool>,
    pub llm_base_url: Option<String>,
    pub llm_timeout_secs: Option<u64>,
    pub llm_max_retries: Option<u32>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        no_auth: cli.no_auth,
        auth_enabled: cli.auth_enabled,
        config: cli.config,
        data_dir: cli.data_dir,
        log: cli.log,
        session_secret: cli.session_secret,
        encryption_secret: cli.encryption_secret,
        invitations_enabled: cli.invitations_enabled,
        llm_base_url: cli.llm_base_url,
        llm_timeout_secs: cli.llm_timeout_secs,
        llm_max_retries: cli.llm_max_retries,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_prune_subcommand() {
        let cli = Cli::try_parse_from(["promptbench", "system", "prune", "--yes"]).unwrap();
        match cli.command {
            Some(Commands::System {
                command: SystemCommands::Prune { yes },
            }) => assert!(yes),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "promptbench",
            "--port",
            "8080",
            "--no-auth",
            "--invitations-enabled",
            "false",
            "--data-dir",
            "/tmp/pb",
        ])
        .unwrap();
        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/pb"));
        assert_eq!(cli.port, Some(8080));
        assert!(cli.no_auth);
        assert_eq!(cli.invitations_enabled, Some(false));
    }
}
