// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "PromptBench";

/// Crate name as it appears in tracing targets
pub const APP_CRATE_TARGET: &str = "promptbench_server";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".promptbench";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "promptbench.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "PROMPTBENCH_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "PROMPTBENCH_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "PROMPTBENCH_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "PROMPTBENCH_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5490;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "PROMPTBENCH_DATA_DIR";

// =============================================================================
// Authentication
// =============================================================================

/// Environment variable toggling session authentication
pub const ENV_AUTH_ENABLED: &str = "PROMPTBENCH_AUTH_ENABLED";

/// Environment variable for the JWT signing secret
pub const ENV_SESSION_SECRET: &str = "PROMPTBENCH_SESSION_SECRET";

/// Cookie name for session token
pub const SESSION_COOKIE_NAME: &str = "promptbench_session";

/// Default session TTL in days
pub const DEFAULT_SESSION_TTL_DAYS: u32 = 30;

/// Identity used for every request when authentication is disabled
pub const LOCAL_USER_EMAIL: &str = "local@promptbench.localhost";

/// Display name of the local user
pub const LOCAL_USER_NAME: &str = "Local";

// =============================================================================
// Security
// =============================================================================

/// Environment variable for the provider key encryption secret
pub const ENV_ENCRYPTION_SECRET: &str = "PROMPTBENCH_ENCRYPTION_SECRET";

/// Minimum accepted length of the encryption secret
pub const MIN_ENCRYPTION_SECRET_LEN: usize = 16;

// =============================================================================
// Feature Flags
// =============================================================================

/// Environment variable gating invitation creation
pub const ENV_INVITATIONS_ENABLED: &str = "PROMPTBENCH_INVITATIONS_ENABLED";

// =============================================================================
// LLM Provider
// =============================================================================

/// Environment variable for the OpenAI-compatible base URL
pub const ENV_LLM_BASE_URL: &str = "PROMPTBENCH_LLM_BASE_URL";

/// Environment variable for the per-call LLM timeout
pub const ENV_LLM_TIMEOUT_SECS: &str = "PROMPTBENCH_LLM_TIMEOUT_SECS";

/// Environment variable for the LLM retry budget
pub const ENV_LLM_MAX_RETRIES: &str = "PROMPTBENCH_LLM_MAX_RETRIES";

/// Default chat-completions base URL
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default per-call timeout (seconds)
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Default number of retries after the first attempt
pub const DEFAULT_LLM_MAX_RETRIES: u32 = 1;

/// Initial backoff delay before the first retry (milliseconds)
pub const LLM_RETRY_BASE_DELAY_MS: u64 = 500;

/// Provider whose key is used for simulations
pub const SIMULATION_PROVIDER: &str = "openai";

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "promptbench.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// WAL checkpoint interval in seconds (5 minutes)
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Request Body Limits
// =============================================================================

/// Default body limit for general API requests (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Body limit for auth endpoints (64 KB)
pub const AUTH_BODY_LIMIT: usize = 64 * 1024;

// =============================================================================
// Shutdown
// =============================================================================

/// Max time to wait for background tasks on shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Organizations
// =============================================================================

/// Invitation lifetime in days
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Invitation token length in random bytes (hex-encoded to twice this)
pub const INVITATION_TOKEN_BYTES: usize = 32;

/// Organization name length bounds
pub const ORG_NAME_MIN_LEN: usize = 2;
pub const ORG_NAME_MAX_LEN: usize = 100;

/// Attempts at inserting an organization before giving up on slug conflicts
pub const ORG_SLUG_MAX_ATTEMPTS: u32 = 20;

/// Display name used when an identity carries neither name nor email
pub const PERSONAL_WORKSPACE_FALLBACK: &str = "Personal";

// =============================================================================
// Tenant Resources
// =============================================================================

/// Maximum length of prompt/scenario names
pub const RESOURCE_NAME_MAX_LEN: usize = 200;

/// Maximum length of a variable key
pub const VARIABLE_KEY_MAX_LEN: usize = 64;

/// Upper bound on probed "(Copy N)" suffixes
pub const DUPLICATE_NAME_MAX_PROBES: u32 = 1000;

/// Sentinel assistant content for a failed simulation turn
pub const SIMULATION_ERROR_TEXT: &str = "[Error: Failed to get AI response]";
