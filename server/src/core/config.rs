//! Process configuration
//!
//! All settings come from the environment (optionally seeded from a
//! `.env.{environment}` file). Parsing is all-or-nothing: every problem is
//! collected and reported in one error so a misconfigured deployment fails
//! fast with the full list instead of one variable at a time.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::constants::DEFAULT_PORT;

/// Configuration error listing every invalid or missing variable
#[derive(Debug, Error)]
#[error("invalid environment variables:\n{}", problems.join("\n"))]
pub struct ConfigError {
    pub problems: Vec<String>,
}

/// Deployment environment name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "staging" => Some(Self::Staging),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "prod"),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
}

/// Authentication feature configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub require_email_verification: bool,
    /// Whether the GitHub third-party provider accepts sign-ins
    pub github: bool,
}

/// PostgreSQL connection parameters
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
    pub debug: bool,
}

impl PostgresConfig {
    /// Assemble the sqlx connection URL
    pub fn url(&self) -> String {
        let ssl_mode = if self.ssl { "require" } else { "prefer" };
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.db, ssl_mode
        )
    }
}

/// Redis connection parameters
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Identity provider (session/auth core) connection parameters
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub connection_uri: String,
    pub api_key: String,
    pub api_domain: String,
    pub website_domain: String,
    pub app_name: String,
}

/// Object storage parameters
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
}

/// Final validated application configuration.
///
/// Either fully valid or the process does not start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub release: String,
    pub encryption_secret: String,
    pub emails_endpoint: String,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub postgres: PostgresConfig,
    pub redis: RedisConfig,
    pub identity: IdentityConfig,
    pub s3: S3Config,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load configuration from an explicit variable map (test seam)
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut env = Vars {
            vars,
            problems: Vec::new(),
        };

        let environment = env
            .optional("ENVIRONMENT")
            .map(|v| {
                Environment::parse(&v).unwrap_or_else(|| {
                    env.problems
                        .push(format!("ENVIRONMENT: unknown environment '{v}'"));
                    Environment::Development
                })
            })
            .unwrap_or_default();

        let release = env.optional("RELEASE").unwrap_or_else(|| "local".into());
        let encryption_secret = env.required("ENCRYPTION_SECRET");
        let emails_endpoint = env.required_url("EMAILS_ENDPOINT");

        let port = env.optional_u16("PORT").unwrap_or(DEFAULT_PORT);

        let require_email_verification = env.flag("AUTH_REQUIRE_EMAIL_VERIFICATION");
        let github = env.flag("AUTH_GITHUB");

        let postgres = PostgresConfig {
            host: env.required("POSTGRES_HOST"),
            port: env.required_u16("POSTGRES_PORT"),
            db: env.required("POSTGRES_DB"),
            user: env.required("POSTGRES_USER"),
            password: env.required("POSTGRES_PASSWORD"),
            ssl: env.flag("POSTGRES_SSL"),
            debug: env.flag("POSTGRES_DEBUG"),
        };

        let redis = RedisConfig {
            url: env.required("REDIS_URL"),
        };

        let identity = IdentityConfig {
            connection_uri: env.required_url("IDENTITY_CONNECTION_URI"),
            api_key: env.required("IDENTITY_API_KEY"),
            api_domain: env.required_url("IDENTITY_API_DOMAIN"),
            website_domain: env.required_url("IDENTITY_WEBSITE_DOMAIN"),
            app_name: env.required("IDENTITY_APP_NAME"),
        };

        let s3 = S3Config {
            endpoint: env.required_url("S3_ENDPOINT"),
            access_key_id: env.required("S3_ACCESS_KEY_ID"),
            secret_access_key: env.required("S3_SECRET_ACCESS_KEY"),
            bucket_name: env.required("S3_BUCKET_NAME"),
        };

        let log_level = match env.optional("LOG_LEVEL") {
            Some(level) => {
                const LEVELS: &[&str] =
                    &["trace", "debug", "info", "warn", "error", "silent"];
                if LEVELS.contains(&level.as_str()) {
                    level
                } else {
                    env.problems
                        .push(format!("LOG_LEVEL: unknown log level '{level}'"));
                    "info".into()
                }
            }
            None => "info".into(),
        };

        if !env.problems.is_empty() {
            return Err(ConfigError {
                problems: env.problems,
            });
        }

        Ok(Self {
            environment,
            release,
            encryption_secret,
            emails_endpoint,
            http: HttpConfig { port },
            auth: AuthConfig {
                require_email_verification,
                github,
            },
            postgres,
            redis,
            identity,
            s3,
            log: LogConfig { level: log_level },
        })
    }
}

/// Working state for variable extraction; empty strings count as unset
struct Vars {
    vars: HashMap<String, String>,
    problems: Vec<String>,
}

impl Vars {
    fn optional(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, name: &str) -> String {
        match self.optional(name) {
            Some(value) => value,
            None => {
                self.problems.push(format!("{name}: required but not set"));
                String::new()
            }
        }
    }

    fn required_url(&mut self, name: &str) -> String {
        let value = self.required(name);
        if !value.is_empty() && !value.contains("://") {
            self.problems
                .push(format!("{name}: expected a URL, got '{value}'"));
        }
        value
    }

    fn optional_u16(&mut self, name: &str) -> Option<u16> {
        let value = self.optional(name)?;
        match value.parse::<u16>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                self.problems
                    .push(format!("{name}: expected a port number, got '{value}'"));
                None
            }
        }
    }

    fn required_u16(&mut self, name: &str) -> u16 {
        if self.optional(name).is_none() {
            self.problems.push(format!("{name}: required but not set"));
            return 0;
        }
        self.optional_u16(name).unwrap_or(0)
    }

    /// A "1"/"0" toggle; anything other than "1" is off
    fn flag(&self, name: &str) -> bool {
        self.optional(name).as_deref() == Some("1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_vars() -> HashMap<String, String> {
        [
            ("ENCRYPTION_SECRET", "secret"),
            ("EMAILS_ENDPOINT", "http://emails.internal"),
            ("POSTGRES_HOST", "localhost"),
            ("POSTGRES_PORT", "5432"),
            ("POSTGRES_DB", "beacon"),
            ("POSTGRES_USER", "beacon"),
            ("POSTGRES_PASSWORD", "pw"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("IDENTITY_CONNECTION_URI", "http://identity:3567"),
            ("IDENTITY_API_KEY", "key"),
            ("IDENTITY_API_DOMAIN", "http://api.local"),
            ("IDENTITY_WEBSITE_DOMAIN", "http://web.local"),
            ("IDENTITY_APP_NAME", "beacon"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("S3_ACCESS_KEY_ID", "ak"),
            ("S3_SECRET_ACCESS_KEY", "sk"),
            ("S3_BUCKET_NAME", "uploads"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let config = AppConfig::from_vars(valid_vars()).unwrap();
        assert_eq!(config.http.port, DEFAULT_PORT);
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.environment.is_production());
        assert_eq!(config.release, "local");
        assert_eq!(config.log.level, "info");
        assert!(!config.auth.github);
    }

    #[test]
    fn test_all_problems_reported_together() {
        let mut vars = valid_vars();
        vars.remove("ENCRYPTION_SECRET");
        vars.insert("POSTGRES_PORT".into(), "not-a-port".into());
        vars.insert("LOG_LEVEL".into(), "shout".into());

        let err = AppConfig::from_vars(vars).unwrap_err();
        assert_eq!(err.problems.len(), 3);
        assert!(err.to_string().contains("ENCRYPTION_SECRET"));
        assert!(err.to_string().contains("POSTGRES_PORT"));
        assert!(err.to_string().contains("LOG_LEVEL"));
    }

    #[test]
    fn test_empty_string_is_unset() {
        let mut vars = valid_vars();
        vars.insert("ENCRYPTION_SECRET".into(), "  ".into());
        let err = AppConfig::from_vars(vars).unwrap_err();
        assert!(err.to_string().contains("ENCRYPTION_SECRET"));
    }

    #[test]
    fn test_environment_parsing() {
        let mut vars = valid_vars();
        vars.insert("ENVIRONMENT".into(), "prod".into());
        let config = AppConfig::from_vars(vars).unwrap();
        assert!(config.environment.is_production());
    }

    #[test]
    fn test_github_provider_toggle() {
        let mut vars = valid_vars();
        vars.insert("AUTH_GITHUB".into(), "1".into());
        let config = AppConfig::from_vars(vars).unwrap();
        assert!(config.auth.github);
    }

    #[test]
    fn test_postgres_url_assembly() {
        let config = AppConfig::from_vars(valid_vars()).unwrap();
        assert_eq!(
            config.postgres.url(),
            "postgres://beacon:pw@localhost:5432/beacon?sslmode=prefer"
        );
    }

    #[test]
    fn test_malformed_url_rejected() {
        let mut vars = valid_vars();
        vars.insert("EMAILS_ENDPOINT".into(), "emails.internal".into());
        let err = AppConfig::from_vars(vars).unwrap_err();
        assert!(err.to_string().contains("EMAILS_ENDPOINT"));
    }
}
