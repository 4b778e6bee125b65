//! HTTP endpoint returning a Stockfish best move for a FEN position
//!
//! ```text
//! POST /get_best_move {"fen": "..."}
//!   -> validation::is_valid_position
//!   -> engine::MoveEngine::best_move   (pooled UCI sessions, bounded by a timeout)
//!   -> validation::is_legal_move
//!   -> {"best_move": "..."}
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod validation;

pub use config::{Config, EngineLocator, EngineSettings, SearchLimit};
pub use engine::{EnginePool, MoveEngine, UciSession};
pub use error::{ApiError, EngineError};
