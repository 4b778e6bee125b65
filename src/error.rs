//! Error types for the best-move service
//!
//! Two layers, each with its own enum:
//! - [`EngineError`] for everything that can go wrong talking to the engine process
//! - [`ApiError`] for request handling, which wraps engine failures and maps
//!   every variant onto an HTTP status and a JSON `{"error": ...}` body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

/// Errors raised by the engine adapter
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The executable could not be spawned (missing, not executable, ...)
    #[error("Engine executable {path:?} could not be started: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No override given and no table entry for this platform family
    #[error("No engine executable configured for platform family `{family}`")]
    NoExecutable { family: String },

    /// The call did not complete within its deadline
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),

    /// The engine closed stdout before sending the expected token
    #[error("Engine closed its output while waiting for `{expected}`")]
    Disconnected { expected: &'static str },

    /// The engine answered with something that is not valid UCI
    #[error("Malformed engine reply: {line}")]
    Protocol { line: String },

    /// Pipe I/O failure
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True when the engine could not be reached at all, as opposed to
    /// failing mid-conversation
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            EngineError::Unavailable { .. } | EngineError::NoExecutable { .. }
        )
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by the `/get_best_move` handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request carried no usable `fen` field
    #[error("FEN is required")]
    MissingFen,

    /// `fen` is not a legal chess position
    #[error("Invalid FEN position")]
    InvalidFen,

    /// The engine answered with a move that is not legal in the position
    #[error("Invalid move generated")]
    InvalidMove { fen: String, mv: String },

    /// The request body could not be read (too large, aborted, ...)
    #[error("Unreadable request body: {detail}")]
    Body { status: StatusCode, detail: String },

    /// Engine adapter failure
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFen | ApiError::InvalidFen => StatusCode::BAD_REQUEST,
            ApiError::InvalidMove { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body { status, .. } => *status,
            ApiError::Engine(EngineError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body. Engine details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::MissingFen => "FEN is required",
            ApiError::InvalidFen => "Invalid FEN position",
            ApiError::InvalidMove { .. } => "Invalid move generated",
            ApiError::Body { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "Request body too large"
            }
            ApiError::Body { .. } => "Request body could not be read",
            ApiError::Engine(EngineError::Timeout(_)) => "Chess engine timed out",
            ApiError::Engine(e) if e.is_unavailable() => "Chess engine unavailable",
            ApiError::Engine(_) => "Chess engine failed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::MissingFen | ApiError::InvalidFen | ApiError::Body { .. } => {
                tracing::warn!("[API] Rejected request: {}", self);
            }
            ApiError::InvalidMove { fen, mv } => {
                tracing::error!("[API] Engine produced illegal move {:?} for {:?}", mv, fen);
            }
            ApiError::Engine(e) => {
                tracing::error!("[API] Engine failure: {}", e);
            }
        }

        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// Result type alias for handler operations
pub type ApiResult<T> = Result<T, ApiError>;
