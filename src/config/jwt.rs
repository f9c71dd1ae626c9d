// ============================================================================
// JWT Configuration
// ============================================================================

use super::env_parse;

pub(crate) const DEV_SECRET: &str = "your-secret-key-change-in-production";
const DEFAULT_ISSUER: &str = "chatservice";
const DEFAULT_EXPIRY_HOURS: i64 = 24;
/// One year
pub(crate) const MAX_EXPIRY_HOURS: i64 = 24 * 366;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: String,
    pub issuer: String,
    /// Lifetime of issued tokens
    pub expiry_hours: i64,
}

impl JwtConfig {
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("JWT_SECRET_KEY").unwrap_or_else(|_| DEV_SECRET.to_string());

        let expiry_hours = env_parse("JWT_EXPIRY_HOURS", DEFAULT_EXPIRY_HOURS);
        if !(1..=MAX_EXPIRY_HOURS).contains(&expiry_hours) {
            anyhow::bail!(
                "JWT_EXPIRY_HOURS must be between 1 and {}, got {}",
                MAX_EXPIRY_HOURS,
                expiry_hours
            );
        }

        Ok(Self {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            expiry_hours,
        })
    }
}

impl JwtConfig {
    /// True when tokens are signed with the well-known development secret
    pub fn uses_dev_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            expiry_hours: DEFAULT_EXPIRY_HOURS,
        }
    }
}
