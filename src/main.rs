use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod board;
mod cache;
mod cli;
mod config;
mod errors;
mod license;
mod middleware;
mod models;
mod store;

use cache::TieredCache;
use license::{issuer, LicenseVerifier};
use models::license::LicenseClaims;
use store::postgres::PgStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub db: PgStore,
    pub cache: TieredCache,
    pub verifier: LicenseVerifier,
    pub config: config::Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "taskdeck=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::License { command }) => handle_license_command(cfg, command).await,
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn handle_license_command(
    cfg: config::Config,
    command: cli::LicenseCommands,
) -> anyhow::Result<()> {
    match command {
        cli::LicenseCommands::Install { token } => {
            let verifier = LicenseVerifier::from_hex_key(&cfg.license_public_key)?;
            let verdict = verifier.verify(&token);
            if !verdict.valid {
                anyhow::bail!(
                    "token rejected: {}",
                    verdict.error.as_deref().unwrap_or("invalid license")
                );
            }
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            db.set_license(&token).await?;
            println!(
                "License installed for {} (expires {})",
                verdict.customer.as_deref().unwrap_or("?"),
                verdict.expiry.as_deref().unwrap_or("?"),
            );
            Ok(())
        }
        cli::LicenseCommands::Status => {
            let verifier = LicenseVerifier::from_hex_key(&cfg.license_public_key)?;
            let db = PgStore::connect(&cfg.database_url).await?;
            let verdict = match db.get_license().await? {
                Some(token) => verifier.verify(&token),
                None => models::license::Verdict::rejected("No license installed"),
            };
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            Ok(())
        }
        cli::LicenseCommands::Issue {
            signing_key,
            customer,
            expiry,
        } => {
            chrono::NaiveDate::parse_from_str(&expiry, "%Y-%m-%d")
                .map_err(|_| anyhow::anyhow!("expiry must be a YYYY-MM-DD date"))?;
            let signer = issuer::LicenseSigner::from_hex(&signing_key)?;
            let token = issuer::issue(
                &signer,
                &LicenseClaims {
                    expiry,
                    customer,
                    created: Some(chrono::Utc::now().to_rfc3339()),
                },
            );
            println!("{}", token);
            Ok(())
        }
        cli::LicenseCommands::Keygen => {
            let signer = issuer::LicenseSigner::generate();
            println!("signing key (keep private): {}", signer.seed_hex());
            println!("verifying key (embed/ship): {}", signer.verifying_key_hex());
            Ok(())
        }
    }
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    tracing::info!("Connecting to Redis...");
    let redis_client = redis::Client::open(cfg.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let cache = TieredCache::new(redis_conn);

    let verifier = LicenseVerifier::from_hex_key(&cfg.license_public_key)?;

    let state = Arc::new(AppState {
        db,
        cache,
        verifier,
        config: cfg,
    });

    // Bound local cache memory: expired verdict/counter entries are swept
    // once a minute.
    {
        let cache = state.cache.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                tick.tick().await;
                let evicted = cache.evict_expired();
                if evicted > 0 {
                    tracing::debug!("evicted {} expired cache entries", evicted);
                }
            }
        });
    }

    let app = axum::Router::new()
        // Health endpoints (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .route("/readyz", axum::routing::get(readiness_check))
        // Board API — nested under /api/v1 (preserves middleware + fallback)
        .nest("/api/v1", api::api_router(state.clone()))
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer({
            use axum::http::{HeaderName, Method};
            use tower_http::cors::{AllowOrigin, CorsLayer};
            let board_origin = std::env::var("TASKDECK_BOARD_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string());
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(move |origin, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str == board_origin
                        || origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                }))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("authorization"),
                    HeaderName::from_static("x-api-key"),
                    HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true)
        })
        .layer(axum::middleware::from_fn(request_id_middleware));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Taskdeck listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response so clients
/// can correlate errors with service logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Readiness: the service is ready once Postgres answers.
async fn readiness_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Result<&'static str, axum::http::StatusCode> {
    sqlx::query("SELECT 1")
        .execute(state.db.pool())
        .await
        .map_err(|e| {
            tracing::warn!("readiness check failed: {}", e);
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        })?;
    Ok("ready")
}
