//! Engine adapter
//!
//! The request handler only sees [`MoveEngine`]. The production
//! implementation is [`EnginePool`], a bounded set of long-lived
//! [`UciSession`]s, each owning one Stockfish process.
//!
//! # Lifecycle
//!
//! 1. A request checks a session out of the pool (spawning one if none is idle)
//! 2. The session resets (`ucinewgame`), sets the position and searches
//! 3. The checkout guard puts the session back when dropped, or kills it if
//!    the exchange did not complete (error, timeout)

mod pool;
mod uci;

pub use pool::{EnginePool, PooledSession};
pub use uci::{parse_bestmove, UciSession};

use crate::error::EngineResult;
use async_trait::async_trait;
use std::time::Duration;

/// Something that can suggest a move for a validated position
#[async_trait]
pub trait MoveEngine: Send + Sync {
    /// Best move for `fen` in UCI coordinate notation.
    ///
    /// Must give up with [`crate::error::EngineError::Timeout`] once
    /// `timeout` has elapsed.
    async fn best_move(&self, fen: &str, timeout: Duration) -> EngineResult<String>;
}
