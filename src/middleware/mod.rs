mod activity;
mod rate_limit;

pub use activity::record_activity;
pub use rate_limit::{login_limiter, RateLimiter};
