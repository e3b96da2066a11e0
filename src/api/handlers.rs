use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::reorder;
use crate::errors::AppError;
use crate::middleware::{license_gate, rate_limit};
use crate::models::card::{Card, DropEvent};
use crate::models::license::Verdict;
use crate::store::postgres::CardRow;
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub cards: Vec<Card>,
    pub event: DropEvent,
}

#[derive(Serialize)]
pub struct ReorderResponse {
    pub cards: Vec<Card>,
}

#[derive(Deserialize)]
pub struct InstallLicenseRequest {
    pub token: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /api/v1/boards/:board_id/cards — cards in `(stage, position)` order
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<Vec<CardRow>>, AppError> {
    let rows = state.db.list_cards(board_id).await?;
    Ok(Json(rows))
}

/// POST /api/v1/boards/:board_id/reorder — apply one drop event to the
/// client's card list and persist the renumbered result.
///
/// The client is authoritative over the list it sends: concurrent editors
/// of one board are last-writer-wins, with no version compare on write.
pub async fn reorder_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<ReorderResponse>, AppError> {
    let cards = reorder::apply_drop(payload.cards, &payload.event);
    state.db.save_positions(board_id, &cards).await?;
    Ok(Json(ReorderResponse { cards }))
}

/// GET /api/v1/license — verdict for the installed token, claims included
/// even when expired so the UI can prompt for renewal.
pub async fn license_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Verdict>, AppError> {
    match state.db.get_license().await? {
        Some(token) => Ok(Json(state.verifier.verify(&token))),
        None => Ok(Json(Verdict::rejected("No license installed"))),
    }
}

/// PUT /api/v1/license — verify, then replace the persisted token
/// wholesale. A token that fails verification is never stored.
pub async fn install_license(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<InstallLicenseRequest>,
) -> Result<(StatusCode, Json<Verdict>), AppError> {
    rate_limit::check_install_limit(
        &client_key(&headers),
        state.config.license_rate_limit,
        state.config.license_rate_limit_window,
        &state.cache,
    )
    .await?;

    let verdict = state.verifier.verify(&payload.token);
    if !verdict.valid {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(verdict)));
    }

    state.db.set_license(&payload.token).await?;
    if let Err(e) = state.cache.invalidate(license_gate::VERDICT_CACHE_KEY).await {
        tracing::warn!("failed to invalidate license verdict cache: {}", e);
    }
    tracing::info!(
        customer = verdict.customer.as_deref().unwrap_or(""),
        expiry = verdict.expiry.as_deref().unwrap_or(""),
        "license installed"
    );
    Ok((StatusCode::OK, Json(verdict)))
}

/// Rate-limit key for the caller: first hop of X-Forwarded-For, or a fixed
/// bucket when the service is reached directly.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "direct".to_string())
}
