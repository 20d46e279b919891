//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{ApiServer, AuthManager};
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands, SystemCommands};
use crate::core::config::AppConfig;
use crate::core::constants::APP_CRATE_TARGET;
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::TransactionalService;
use crate::domain::simulation::{LlmClient, OpenAiCompatibleClient};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub database: Arc<TransactionalService>,
    pub auth: Arc<AuthManager>,
    pub llm: Arc<dyn LlmClient>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.log.as_deref());

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::System {
                command: system_cmd,
            }) => {
                return Self::handle_system_command(system_cmd, &cli_config);
            }
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(cli.data_dir.as_deref()).await?;
        let database = Arc::new(
            TransactionalService::init(&storage)
                .await
                .context("Failed to open database")?,
        );
        let llm: Arc<dyn LlmClient> = Arc::new(
            OpenAiCompatibleClient::new(&config.llm)
                .map_err(|e| anyhow::anyhow!("Failed to build LLM client: {}", e))?,
        );

        Ok(Self::assemble(config, storage, database, llm))
    }

    /// Wire already-opened resources into an application
    pub fn assemble(
        config: AppConfig,
        storage: AppStorage,
        database: Arc<TransactionalService>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let auth = Arc::new(AuthManager::new(&config.auth));
        let shutdown = ShutdownService::new(database.clone());

        Self {
            shutdown,
            config,
            storage,
            database,
            auth,
            llm,
        }
    }

    fn handle_system_command(cmd: SystemCommands, cli: &CliConfig) -> Result<()> {
        match cmd {
            SystemCommands::Prune { yes } => Self::prune_data(cli.data_dir.as_deref(), yes),
        }
    }

    fn prune_data(data_dir: Option<&str>, skip_confirm: bool) -> Result<()> {
        let data_dir = AppStorage::resolve_data_dir(data_dir);

        if !data_dir.exists() {
            println!(
                "Nothing to prune. Data directory does not exist: {}",
                data_dir.display()
            );
            return Ok(());
        }

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        println!("This will permanently delete the local data directory:");
        println!("  {}", data_dir.display());
        println!();
        println!(
            "Make sure the server is not running. \
             Deleting data while the server is running will cause data corruption."
        );

        if !skip_confirm {
            print!("\nContinue? [y/N] ");
            std::io::Write::flush(&mut std::io::stdout())?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted.");
                return Ok(());
            }
        }

        std::fs::remove_dir_all(&data_dir)
            .with_context(|| format!("Failed to delete data directory: {}", data_dir.display()))?;
        println!("Pruned: {}", data_dir.display());
        Ok(())
    }

    /// `--log` (or its env var) wins over `RUST_LOG`, which wins over the default
    fn init_logging(cli_filter: Option<&str>) {
        let default_filter = format!("info,{}=info", APP_CRATE_TARGET);

        let filter = cli_filter
            .map(str::to_string)
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        banner::print_banner(
            &app.config.server.host,
            app.config.server.port,
            app.auth.is_enabled(),
            app.auth.bootstrap_token(),
            &app.storage.data_dir().display().to_string(),
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.database
                    .start_checkpoint_task(self.shutdown.subscribe()),
            )
            .await;

        tracing::debug!("Background tasks started");
    }
}
