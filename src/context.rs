use crate::auth::AuthManager;
use crate::config::Config;
use crate::rate_limit::TokenBucket;
use crate::service::MessageService;
use std::sync::Arc;

/// Application context containing shared dependencies
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<MessageService>,
    pub auth_manager: Arc<AuthManager>,
    /// Single admission bucket shared by every request
    pub rate_limiter: Arc<TokenBucket>,
    pub config: Arc<Config>,
}

impl AppContext {
    /// Creates a new application context
    pub fn new(
        service: Arc<MessageService>,
        auth_manager: Arc<AuthManager>,
        rate_limiter: Arc<TokenBucket>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            service,
            auth_manager,
            rate_limiter,
            config,
        }
    }
}
