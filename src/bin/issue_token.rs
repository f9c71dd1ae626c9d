//! Mint a bearer token for a subject with the service's JWT settings.
//!
//! Usage: issue_token <subject>

use anyhow::{bail, Context, Result};
use chat_service::auth::AuthManager;
use chat_service::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the token
    tracing_subscriber::registry()
        .with(chat_service::log_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let subject = match std::env::args().nth(1) {
        Some(s) if !s.trim().is_empty() => s,
        _ => bail!("usage: issue_token <subject>"),
    };

    let config = Config::from_env()?;
    chat_service::warn_on_insecure_config(&config);

    let auth_manager = AuthManager::new(&config.jwt).context("Failed to initialize JWT")?;
    let token = auth_manager.create_token(&subject)?;

    eprintln!(
        "Token for '{}' (issuer {}, valid {}h):",
        subject, config.jwt.issuer, config.jwt.expiry_hours
    );
    println!("{}", token);
    Ok(())
}
