use crate::engine::MoveEngine;
use crate::error::{ApiError, ApiResult};
use crate::validation::{is_legal_move, is_valid_position};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Json, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Shared handler state; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn MoveEngine>,
    /// Bound on a single engine call
    pub timeout: Duration,
}

impl AppState {
    pub fn new(engine: Arc<dyn MoveEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BestMoveRequest {
    /// Kept untyped so a non-string `fen` can be told apart from a missing one
    #[serde(default)]
    pub fen: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BestMoveResponse {
    pub best_move: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/get_best_move", get(get_best_move).post(get_best_move))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pull the `fen` field out of the JSON body.
///
/// An empty body, invalid JSON, or a `fen` that is absent, `null` or `""`
/// counts as missing. Any other string is returned for position validation;
/// any other JSON value is not a position at all.
fn parse_payload(body: &[u8]) -> ApiResult<String> {
    let request: BestMoveRequest =
        serde_json::from_slice(body).map_err(|_| ApiError::MissingFen)?;

    match request.fen {
        None | Some(Value::Null) => Err(ApiError::MissingFen),
        Some(Value::String(fen)) if fen.is_empty() => Err(ApiError::MissingFen),
        Some(Value::String(fen)) => Ok(fen),
        Some(_) => Err(ApiError::InvalidFen),
    }
}

async fn get_best_move(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<BestMoveResponse>> {
    let body = body.map_err(|rejection| ApiError::Body {
        status: rejection.status(),
        detail: rejection.body_text(),
    })?;
    let fen = parse_payload(&body)?;

    if !is_valid_position(&fen) {
        return Err(ApiError::InvalidFen);
    }

    let best_move = state.engine.best_move(&fen, state.timeout).await?;

    // Illegal engine output is a server fault, never bad input
    if !is_legal_move(&fen, &best_move) {
        return Err(ApiError::InvalidMove { fen, mv: best_move });
    }

    tracing::info!("[API] {} -> {}", fen, best_move);
    Ok(Json(BestMoveResponse { best_move }))
}
