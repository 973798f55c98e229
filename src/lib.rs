pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::Config;
pub use db::{init_pool, run_migrations};
pub use error::{AppError, AppResult};
pub use mail::{LogMailer, Mailer, MemoryMailer};
pub use routes::create_router;
pub use state::AppState;
