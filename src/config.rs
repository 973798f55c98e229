use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Server configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub reset_token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub login_attempts_per_minute: u32,
    pub email_from: String,
    pub uploads_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    /// JWT_SECRET is required, everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://rentwise.db".to_string());

        let listen_addr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:4000".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("LISTEN_ADDR", "must be a valid socket address"))?;

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let jwt_ttl_minutes = parse_or("JWT_TTL_MINUTES", 15, "must be a positive integer")?;
        let refresh_token_ttl_days =
            parse_or("REFRESH_TOKEN_TTL_DAYS", 7, "must be a positive integer")?;
        let reset_token_ttl_hours =
            parse_or("RESET_TOKEN_TTL_HOURS", 24, "must be a positive integer")?;

        let bcrypt_cost: u32 = parse_or("BCRYPT_COST", 10, "must be between 4 and 31")?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid("BCRYPT_COST", "must be between 4 and 31"));
        }

        let login_attempts_per_minute =
            parse_or("LOGIN_ATTEMPTS_PER_MINUTE", 10, "must be a positive integer")?;

        let email_from = std::env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "no-reply@rentwise.local".to_string());

        let uploads_dir = std::env::var("UPLOADS_DIR")
            .unwrap_or_else(|_| "uploads".to_string())
            .into();

        Ok(Config {
            listen_addr,
            database_url,
            jwt_secret,
            jwt_ttl_minutes,
            refresh_token_ttl_days,
            reset_token_ttl_hours,
            bcrypt_cost,
            login_attempts_per_minute,
            email_from,
            uploads_dir,
        })
    }

    /// Configuration for tests: in-memory database, cheap password hashing.
    pub fn for_testing() -> Self {
        Config {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            reset_token_ttl_hours: 24,
            bcrypt_cost: 4,
            login_attempts_per_minute: 10,
            email_from: "no-reply@rentwise.test".to_string(),
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}

fn parse_or<T: FromStr>(
    var: &'static str,
    default: T,
    msg: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(s) if !s.trim().is_empty() => {
            s.trim().parse().map_err(|_| ConfigError::Invalid(var, msg))
        }
        _ => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, &'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => {
                write!(f, "Missing required environment variable: {}", var)
            }
            ConfigError::Invalid(var, msg) => write!(f, "Invalid value for {}: {}", var, msg),
        }
    }
}

impl std::error::Error for ConfigError {}
