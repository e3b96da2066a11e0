use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::middleware::license_gate;
use crate::AppState;

pub mod handlers;

/// Build the board API router.
/// All routes are relative — the caller mounts this under `/api/v1`.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // License endpoints stay reachable without a valid license; everything
    // touching boards sits behind the gate.
    let board_routes = Router::new()
        .route("/boards/:board_id/cards", get(handlers::list_cards))
        .route("/boards/:board_id/reorder", post(handlers::reorder_board))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_license,
        ));

    Router::new()
        .merge(board_routes)
        .route(
            "/license",
            get(handlers::license_status).put(handlers::install_license),
        )
        .layer(middleware::from_fn_with_state(state, api_key_auth))
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: validates `X-Api-Key` (or `Authorization: Bearer`) against
/// the configured service key in constant time.
async fn api_key_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided_key = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim())
        });

    let expected = state.config.api_key.as_bytes();

    match provided_key {
        Some(k) if bool::from(k.as_bytes().ct_eq(expected)) => Ok(next.run(req).await),
        Some(k) => {
            // SECURITY: never log the expected key or the full provided key
            let masked = if k.len() > 8 {
                format!("{}…{}", &k[..4], &k[k.len() - 4..])
            } else {
                "****".to_string()
            };
            tracing::warn!("board API: invalid key (provided: '{}')", masked);
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("board API: missing X-Api-Key header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Middleware: rejects board traffic unless the installed license verifies
/// and is not expired. The verdict comes from the short-TTL cache tier.
async fn require_license(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let verdict = license_gate::current_verdict(
        &state.db,
        &state.cache,
        &state.verifier,
        state.config.license_cache_ttl,
    )
    .await?;
    license_gate::require_valid(&verdict)?;
    Ok(next.run(req).await)
}
