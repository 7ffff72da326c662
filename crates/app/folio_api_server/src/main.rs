//! Folio admin API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations,
//! optionally seeds a first SupAdmin, then serves until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use folio_api::config::ApiConfig;
use folio_api::{AppState, router};
use folio_core::auth::password;
use folio_core::models::{NewUser, UserType};
use folio_core::notify::LogNotifier;
use folio_core::store::{PgUserStore, StoreError, UserStore};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "folio_api_server", about = "Folio admin API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/folio"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Create a SupAdmin with this username if it does not exist yet.
    /// The password is read from `FOLIO_SEED_ADMIN_PASSWORD`.
    #[arg(long, env = "FOLIO_SEED_ADMIN_USERNAME")]
    seed_admin_username: Option<String>,
}

async fn seed_admin(
    store: &dyn UserStore,
    username: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if store.find_user_by_username(username).await?.is_some() {
        info!(username, "seed admin already present");
        return Ok(());
    }
    let pw = std::env::var("FOLIO_SEED_ADMIN_PASSWORD")
        .map_err(|_| "FOLIO_SEED_ADMIN_PASSWORD must be set to seed an admin")?;
    let (hash, salt) = password::new_password_hash(&pw)?;
    let created = store
        .create_user(
            NewUser {
                name: username.to_string(),
                email: None,
                mobile: None,
                country_code: None,
                username: username.to_string(),
                user_type: UserType::SuperAdmin,
            },
            &hash,
            &salt,
        )
        .await;
    match created {
        Ok(user) => info!(user_id = user.id, username, "seeded SupAdmin"),
        // Another instance won the race.
        Err(StoreError::Conflict(_)) => warn!(username, "seed admin created concurrently"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,folio_api=debug,folio_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind_addr,
        database_url: args.database_url,
        ..ApiConfig::from_env()?
    };
    info!(
        bind_addr = %config.bind_addr,
        issuer = %config.secrets.jwt_issuer,
        "starting folio_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    folio_api::migrate(&pool).await?;

    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));
    if let Some(username) = args.seed_admin_username.as_deref() {
        seed_admin(store.as_ref(), username).await?;
    }

    let state = AppState::new(config.clone(), store, Arc::new(LogNotifier));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("ctrl-c received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "could not listen for ctrl-c"),
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server stopped");
    Ok(())
}
