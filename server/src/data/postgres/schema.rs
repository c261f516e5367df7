//! PostgreSQL schema definitions
//!
//! Initial schema with all tables. Applied in one shot on a fresh database,
//! evolved through versioned migrations afterwards.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL for PostgreSQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL,
    execution_time_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT TRUE
);

-- =============================================================================
-- 1. Users (domain mirror of identity provider accounts)
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL UNIQUE,
    email TEXT CHECK(email IS NULL OR length(email) >= 3),
    username TEXT CHECK(username IS NULL OR length(username) <= 100),
    external_auth_id TEXT,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- =============================================================================
-- 2. Emergencies
-- =============================================================================
CREATE TABLE IF NOT EXISTS emergencies (
    id TEXT PRIMARY KEY,
    reporter_subject_id TEXT NOT NULL REFERENCES users(subject_id) ON DELETE CASCADE,
    category TEXT NOT NULL CHECK(length(category) >= 1 AND length(category) <= 50),
    description TEXT NOT NULL CHECK(length(description) >= 1),
    latitude DOUBLE PRECISION NOT NULL CHECK(latitude >= -90 AND latitude <= 90),
    longitude DOUBLE PRECISION NOT NULL CHECK(longitude >= -180 AND longitude <= 180),
    address TEXT,
    photo_key TEXT,
    status TEXT NOT NULL DEFAULT 'open' CHECK(status IN ('open', 'resolved', 'dismissed')),
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_emergencies_created ON emergencies(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_emergencies_reporter ON emergencies(reporter_subject_id);
"#;
