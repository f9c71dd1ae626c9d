// ============================================================================
// Database Configuration
// ============================================================================

use std::time::Duration;

use super::env_parse;

const DEFAULT_TABLE: &str = "messages";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5000;

/// Message collection configuration
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Postgres connection URL. `None` selects the in-memory store.
    pub url: Option<String>,
    /// Table holding messages
    pub table: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool (seconds)
    pub acquire_timeout_secs: u64,
    /// Deadline for a single store operation (milliseconds)
    pub operation_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub(crate) fn from_env() -> anyhow::Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());

        let table = std::env::var("DATABASE_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string());
        if !is_valid_identifier(&table) {
            anyhow::bail!(
                "DATABASE_TABLE must be a lowercase SQL identifier ([a-z_][a-z0-9_]*), got '{}'",
                table
            );
        }

        let operation_timeout_ms = env_parse("STORE_OPERATION_TIMEOUT_MS", DEFAULT_OPERATION_TIMEOUT_MS);
        if operation_timeout_ms == 0 {
            anyhow::bail!("STORE_OPERATION_TIMEOUT_MS must be greater than zero");
        }

        Ok(Self {
            url,
            table,
            max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_ACQUIRE_TIMEOUT_SECS),
            operation_timeout_ms,
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: DEFAULT_TABLE.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }
}

/// The table name is interpolated into SQL, so it is restricted to a plain identifier.
pub(crate) fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("messages"));
        assert!(is_valid_identifier("_chat_messages_v2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2messages"));
        assert!(!is_valid_identifier("messages; DROP TABLE users"));
        assert!(!is_valid_identifier("Messages"));
    }
}
