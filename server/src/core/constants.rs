// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Beacon";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "beacon";

/// Deep-link scheme registered by the mobile app
pub const APP_DEEP_LINK_SCHEME: &str = "beacon";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default HTTP port when `PORT` is unset
pub const DEFAULT_PORT: u16 = 3001;

/// Bind address for the HTTP listener
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// GraphQL endpoint path
pub const GRAPHQL_PATH: &str = "/graphql";

// =============================================================================
// Request Handling
// =============================================================================

/// Header carrying (or echoing) the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the shared signature that bypasses introspection gating
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Maximum accepted length for a caller-supplied request id
pub const REQUEST_ID_MAX_LEN: usize = 128;

/// Locale used when `accept-language` is absent or unusable
pub const DEFAULT_LOCALE: &str = "en-US";

/// Locales the resolver layer can serve
pub const SUPPORTED_LOCALES: &[&str] = &["en-US", "tr-TR"];

// =============================================================================
// Sessions
// =============================================================================

/// Cookie name for the session token
pub const SESSION_COOKIE_NAME: &str = "beacon_session";

/// Session token lifetime in days
pub const SESSION_TTL_DAYS: u32 = 30;

/// Session payload schema version (literal claim value)
pub const SESSION_PAYLOAD_VERSION: &str = "1";

// =============================================================================
// Response Cache
// =============================================================================

/// Default response-cache TTL in seconds
pub const RESPONSE_CACHE_TTL_SECS: u64 = 10;

/// TTL override for `Query.emergencies` in production (seconds)
pub const RESPONSE_CACHE_TTL_EMERGENCIES_PROD_SECS: u64 = 3600;

/// TTL override for `Query.emergencies` outside production (seconds)
pub const RESPONSE_CACHE_TTL_EMERGENCIES_DEV_SECS: u64 = 3;

// =============================================================================
// PostgreSQL Pool
// =============================================================================

pub const POSTGRES_MAX_CONNECTIONS: u32 = 10;
pub const POSTGRES_MIN_CONNECTIONS: u32 = 0;
pub const POSTGRES_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const POSTGRES_IDLE_TIMEOUT_SECS: u64 = 600;
pub const POSTGRES_MAX_LIFETIME_SECS: u64 = 1800;
pub const POSTGRES_STATEMENT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Startup Readiness
// =============================================================================

/// Overall budget for waiting on Postgres/Redis at startup
pub const STARTUP_WAIT_TIMEOUT_SECS: u64 = 30;

/// Delay between startup connection attempts
pub const STARTUP_WAIT_RETRY_MS: u64 = 500;

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Cache Keys
// =============================================================================

/// Version prefix on every cache key, bump to invalidate all cached data
pub const CACHE_KEY_VERSION: &str = "v1";

/// TTL for cached domain user rows (seconds)
pub const CACHE_TTL_USER: u64 = 60;

/// TTL for negative lookups (known not-found) in seconds
pub const CACHE_TTL_NEGATIVE: u64 = 10;

// =============================================================================
// Topics
// =============================================================================

/// Topic carrying newly reported emergencies
pub const TOPIC_EMERGENCY_REPORTED: &str = "emergency.reported";

/// Buffer capacity for in-memory broadcast topics
pub const TOPIC_CHANNEL_CAPACITY: usize = 256;
