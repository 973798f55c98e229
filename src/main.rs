use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rentwise::{create_router, init_pool, run_migrations, AppState, Config, LogMailer};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Required: JWT_SECRET");
            eprintln!("Optional: DATABASE_URL (default: sqlite://rentwise.db)");
            eprintln!("Optional: LISTEN_ADDR (default: 0.0.0.0:4000)");
            std::process::exit(1);
        }
    };

    tracing::info!("Starting Rentwise server");
    tracing::info!("Listen address: {}", config.listen_addr);
    tracing::info!("Database: {}", config.database_url);

    // Connect to database
    let pool = match init_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Database connection error: {}", e);
            std::process::exit(1);
        }
    };

    // Run migrations
    if let Err(e) = run_migrations(&pool).await {
        eprintln!("Migration error: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Database migrations completed");

    let listen_addr = config.listen_addr;
    let uploads_dir = config.uploads_dir.clone();
    let mailer = Arc::new(LogMailer::new(config.email_from.clone()));
    let state = AppState::new(pool, config, mailer);

    // Forget login windows that have ended
    let limiter = state.login_limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            limiter.cleanup();
            tracing::debug!(tracked = limiter.tracked(), "Login limiter cleanup");
        }
    });

    // Build router
    let app = create_router(state).nest_service("/uploads", ServeDir::new(uploads_dir));

    // Start server
    let listener = match tokio::net::TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server running at http://{}", listen_addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
