use anyhow::Result;

mod database;
mod jwt;
mod rate_limit;

pub use database::DatabaseConfig;
pub use jwt::JwtConfig;
pub(crate) use jwt::MAX_EXPIRY_HOURS;
pub use rate_limit::RateLimitConfig;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
/// Log filter used when RUST_LOG is unset
pub const DEFAULT_RUST_LOG: &str = "info";

// Message content limits (in characters)
pub const MIN_CONTENT_CHARS: usize = 1;
pub const MAX_CONTENT_CHARS: usize = 2000;

// Pagination
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

// ============================================================================
// Configuration Structures
// ============================================================================

/// HTTP listener configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env_parse("SERVER_PORT", DEFAULT_PORT),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    /// Require a bearer token on the message routes
    pub auth_enabled: bool,
}

impl Config {
    /// Loads configuration from the environment (and `.env` when present).
    ///
    /// Every value has a default, so an empty environment yields a runnable
    /// service backed by the in-memory store.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            auth_enabled: env_parse("AUTH_ENABLED", false),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            database: DatabaseConfig::default(),
            jwt: JwtConfig::default(),
            rate_limit: RateLimitConfig::default(),
            auth_enabled: false,
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or unparsable.
pub(crate) fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
