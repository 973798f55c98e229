use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::mail::Mailer;
use crate::middleware::{login_limiter, RateLimiter};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub keys: TokenKeys,
    pub mailer: Arc<dyn Mailer>,
    pub login_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pool,
            keys: TokenKeys::new(&config),
            login_limiter: Arc::new(login_limiter(config.login_attempts_per_minute)),
            config: Arc::new(config),
            mailer,
        }
    }
}
