use std::sync::Arc;

use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interview_billing::config::Config;
use interview_billing::db::{
    billing_repository::BillingRepository, interview_repository::InterviewRepository,
    postgres_billing_repository::PostgresBillingRepository,
    postgres_interview_repository::PostgresInterviewRepository,
    postgres_profile_repository::PostgresProfileRepository,
    profile_repository::ProfileRepository,
};
use interview_billing::routes::app;
use interview_billing::services::paddle::{LivePaddleService, PaddleService};
use interview_billing::utils::jwt::JwtKeys;
use interview_billing::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _sentry = init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    let jwt_keys = JwtKeys::from_secret(&config.supabase_jwt_secret)
        .context("SUPABASE_JWT_SECRET is not usable")?;

    let pg_pool = establish_connection(&config.database_url).await?;
    let profiles = Arc::new(PostgresProfileRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn ProfileRepository>;
    let billing = Arc::new(PostgresBillingRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn BillingRepository>;
    let interviews = Arc::new(PostgresInterviewRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn InterviewRepository>;

    let paddle = Arc::new(
        LivePaddleService::from_settings(&config.paddle)
            .context("failed to build Paddle API client")?,
    ) as Arc<dyn PaddleService>;

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let bind_addr = config.bind_addr;
    let state = AppState {
        profiles,
        billing,
        interviews,
        paddle,
        config: Arc::new(config),
        jwt_keys: Arc::new(jwt_keys),
    };

    let app = app(state).layer(TraceLayer::new_for_http()).layer(cors);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Installs the global subscriber. `LOG_FORMAT=json` switches to structured
/// output; `SENTRY_DSN` enables error reporting. The returned guard flushes
/// Sentry on drop.
fn init_tracing() -> Option<sentry::ClientInitGuard> {
    let sentry_guard = std::env::var("SENTRY_DSN")
        .ok()
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    ..Default::default()
                },
            ))
        });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(sentry_guard.as_ref().map(|_| sentry_tracing::layer()))
        .init();

    sentry_guard
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("successfully connected to the database");
    Ok(pool)
}
