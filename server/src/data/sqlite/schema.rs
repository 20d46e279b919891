//! SQLite schema definitions
//!
//! `SCHEMA` always describes the latest version. Older databases are brought
//! forward by the versioned migrations in `migrations.rs`.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- 1. Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE CHECK(length(email) >= 3),
    name TEXT CHECK(name IS NULL OR length(name) <= 100),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- =============================================================================
-- 2. Organizations (tenant root, references users)
-- =============================================================================
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 2 AND length(name) <= 100),
    slug TEXT NOT NULL UNIQUE CHECK(
        (length(slug) >= 2 AND length(slug) <= 64 AND slug GLOB '[a-z0-9][a-z0-9-]*[a-z0-9]')
        OR (length(slug) = 1 AND slug GLOB '[a-z0-9]')
    ),
    created_by_user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- =============================================================================
-- 3. User Profiles (1:1 with users, soft back-reference to organizations)
-- =============================================================================
CREATE TABLE IF NOT EXISTS user_profiles (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    last_active_org_id TEXT REFERENCES organizations(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_profiles_last_org ON user_profiles(last_active_org_id);

-- =============================================================================
-- 4. Organization Members (references orgs + users)
-- =============================================================================
CREATE TABLE IF NOT EXISTS organization_members (
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'VIEWER' CHECK(role IN ('ADMIN', 'EDITOR', 'VIEWER')),
    status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK(status IN ('ACTIVE', 'INVITED', 'REMOVED')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (organization_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_org_members_user ON organization_members(user_id, status);
CREATE INDEX IF NOT EXISTS idx_org_members_role ON organization_members(organization_id, role, status);

-- =============================================================================
-- 5. Organization Invitations (references orgs + users)
-- =============================================================================
CREATE TABLE IF NOT EXISTS organization_invitations (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    email TEXT NOT NULL CHECK(length(email) >= 3 AND email = lower(email)),
    role TEXT NOT NULL CHECK(role IN ('ADMIN', 'EDITOR', 'VIEWER')),
    token TEXT NOT NULL UNIQUE,
    expires_at INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING' CHECK(status IN ('PENDING', 'ACCEPTED')),
    invited_by_user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    accepted_by_user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invitations_org ON organization_invitations(organization_id, status);
CREATE INDEX IF NOT EXISTS idx_invitations_email_status ON organization_invitations(email, status);

-- =============================================================================
-- 6. Prompts (tenant-scoped)
-- =============================================================================
CREATE TABLE IF NOT EXISTS prompts (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL CHECK(length(name) >= 1),
    description TEXT,
    content TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'DRAFT' CHECK(status IN ('DRAFT', 'PUBLISHED', 'ARCHIVED')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (organization_id, name)
);

CREATE INDEX IF NOT EXISTS idx_prompts_org_updated ON prompts(organization_id, updated_at DESC);

-- =============================================================================
-- 7. Scenarios, Turns, Expectations (tenant-scoped)
-- =============================================================================
CREATE TABLE IF NOT EXISTS scenarios (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL CHECK(length(name) >= 1),
    description TEXT,
    version INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (organization_id, name)
);

CREATE INDEX IF NOT EXISTS idx_scenarios_org_updated ON scenarios(organization_id, updated_at DESC);

CREATE TABLE IF NOT EXISTS scenario_turns (
    id TEXT PRIMARY KEY,
    scenario_id TEXT NOT NULL REFERENCES scenarios(id) ON DELETE CASCADE,
    turn_index INTEGER NOT NULL,
    turn_type TEXT NOT NULL CHECK(turn_type IN ('USER', 'EXPECT')),
    user_text TEXT,
    UNIQUE (scenario_id, turn_index)
);

CREATE TABLE IF NOT EXISTS scenario_expectations (
    id TEXT PRIMARY KEY,
    turn_id TEXT NOT NULL REFERENCES scenario_turns(id) ON DELETE CASCADE,
    position INTEGER NOT NULL DEFAULT 0,
    expectation_type TEXT NOT NULL CHECK(expectation_type IN ('MUST_CONTAIN', 'MUST_NOT_CONTAIN', 'REGEX')),
    args_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expectations_turn ON scenario_expectations(turn_id, position);

-- =============================================================================
-- 8. Variables (tenant-scoped)
-- =============================================================================
CREATE TABLE IF NOT EXISTS variables (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    key TEXT NOT NULL CHECK(length(key) >= 1 AND length(key) <= 64),
    value TEXT NOT NULL DEFAULT '',
    description TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (organization_id, key)
);

-- =============================================================================
-- 9. Provider API Keys (tenant-scoped, encrypted at rest)
-- =============================================================================
CREATE TABLE IF NOT EXISTS provider_api_keys (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    provider TEXT NOT NULL CHECK(length(provider) >= 1 AND length(provider) <= 50),
    encrypted_key TEXT NOT NULL,
    key_hint TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (organization_id, provider)
);
"#;

/// v2: lookup index for identity-driven invitation acceptance
pub const MIGRATION_V2: &str = "CREATE INDEX IF NOT EXISTS idx_invitations_email_status ON organization_invitations(email, status)";
