//! Bounded pool of engine sessions

use super::uci::single_line_fen;
use super::{MoveEngine, UciSession};
use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Idle sessions plus the number of engine processes alive or being spawned
struct Slots {
    idle: Vec<UciSession>,
    live: usize,
}

/// At most `pool_size` engine processes, reused across requests
///
/// Idle sessions wait on a stack; when none is idle a new one is spawned,
/// as long as a permit is available. Callers beyond `pool_size` wait for a
/// permit. Warm-up spawns also hold a permit and never push the live count
/// past `pool_size`.
pub struct EnginePool {
    settings: EngineSettings,
    size: usize,
    slots: Mutex<Slots>,
    permits: Semaphore,
}

impl EnginePool {
    pub fn new(settings: EngineSettings) -> Self {
        let size = settings.pool_size.max(1);
        Self {
            settings,
            size,
            slots: Mutex::new(Slots {
                idle: Vec::with_capacity(size),
                live: 0,
            }),
            permits: Semaphore::new(size),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Sessions currently parked in the pool
    pub fn idle_count(&self) -> usize {
        self.slots.lock().idle.len()
    }

    /// Engine processes owned by the pool, idle or checked out
    pub fn live_count(&self) -> usize {
        self.slots.lock().live
    }

    /// Spawn a session against an already reserved slot
    async fn spawn_session(&self, reservation: SlotReservation<'_>) -> EngineResult<UciSession> {
        let path = self.settings.locator.resolve()?;
        let session = UciSession::spawn(&path, &self.settings.options).await?;
        reservation.commit();
        Ok(session)
    }

    /// Pop the most recent idle session whose process is still running, or
    /// reserve a slot for a new one
    fn take_idle_or_reserve(&self) -> Result<UciSession, SlotReservation<'_>> {
        let mut slots = self.slots.lock();
        while let Some(mut session) = slots.idle.pop() {
            if session.is_alive() {
                return Ok(session);
            }
            slots.live -= 1;
            tracing::warn!("[ENGINE] Dropping dead idle session for {:?}", session.path());
        }
        slots.live += 1;
        Err(SlotReservation {
            pool: self,
            committed: false,
        })
    }

    /// Take a session, waiting for a free slot if the pool is at capacity
    pub async fn checkout(&self) -> EngineResult<PooledSession<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| std::io::Error::other("engine pool is closed"))?;

        let session = match self.take_idle_or_reserve() {
            Ok(session) => session,
            Err(reservation) => self.spawn_session(reservation).await?,
        };

        Ok(PooledSession {
            session: Some(session),
            pool: self,
            reusable: true,
            _permit: permit,
        })
    }

    /// Pre-spawn up to `count` idle sessions; returns how many are idle afterwards
    ///
    /// Stops early when the pool is already at capacity, counting sessions
    /// that are checked out.
    pub async fn warm_up(&self, count: usize) -> EngineResult<usize> {
        let target = count.min(self.size);
        loop {
            let Ok(_permit) = self.permits.try_acquire() else {
                break;
            };
            {
                let mut slots = self.slots.lock();
                if slots.idle.len() >= target || slots.live >= self.size {
                    break;
                }
                slots.live += 1;
            }
            let reservation = SlotReservation {
                pool: self,
                committed: false,
            };
            let session = self.spawn_session(reservation).await?;
            self.slots.lock().idle.push(session);
        }
        Ok(self.idle_count())
    }

    /// Send `quit` to every idle session
    pub async fn shutdown(&self) {
        let sessions: Vec<UciSession> = {
            let mut slots = self.slots.lock();
            let sessions = std::mem::take(&mut slots.idle);
            slots.live -= sessions.len();
            sessions
        };
        tracing::info!("[ENGINE] Shutting down {} idle session(s)", sessions.len());
        for session in sessions {
            session.quit().await;
        }
    }
}

#[async_trait]
impl MoveEngine for EnginePool {
    async fn best_move(&self, fen: &str, timeout: Duration) -> EngineResult<String> {
        let search = async {
            let mut session = self.checkout().await?;
            session.best_move(fen).await
        };

        tokio::time::timeout(timeout, search)
            .await
            .map_err(|_| EngineError::Timeout(timeout))?
    }
}

/// One slot counted in `live` before its process exists
///
/// Released again if the spawn fails or is cancelled.
struct SlotReservation<'a> {
    pool: &'a EnginePool,
    committed: bool,
}

impl SlotReservation<'_> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for SlotReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.pool.slots.lock().live -= 1;
        }
    }
}

/// A session checked out of an [`EnginePool`]
///
/// Dropping the guard returns the session to the pool, unless an exchange
/// was started and did not finish, in which case the process is killed.
pub struct PooledSession<'a> {
    session: Option<UciSession>,
    pool: &'a EnginePool,
    reusable: bool,
    _permit: SemaphorePermit<'a>,
}

impl std::fmt::Debug for PooledSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession")
            .field("session", &self.session)
            .field("reusable", &self.reusable)
            .finish()
    }
}

impl PooledSession<'_> {
    pub async fn best_move(&mut self, fen: &str) -> EngineResult<String> {
        // Rejected before any I/O, so the session stays reusable
        let fen = single_line_fen(fen)?;

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| std::io::Error::other("pooled session already released"))?;

        self.reusable = false;
        let mv = session.best_move(fen, self.pool.settings.limit).await?;
        self.reusable = true;
        Ok(mv)
    }
}

impl Drop for PooledSession<'_> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let mut slots = self.pool.slots.lock();
        if self.reusable {
            slots.idle.push(session);
        } else {
            slots.live -= 1;
            tracing::warn!(
                "[ENGINE] Discarding session for {:?} after an unfinished exchange",
                session.path()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineLocator;

    fn missing_engine_pool(size: usize) -> EnginePool {
        EnginePool::new(EngineSettings {
            pool_size: size,
            ..EngineSettings::for_executable("./no/such/stockfish")
        })
    }

    #[tokio::test]
    async fn test_missing_engine_reports_unavailable() {
        let pool = missing_engine_pool(2);
        let err = pool
            .best_move("4k3/8/8/8/8/8/8/4K3 w - - 0 1", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_unavailable(), "got {err:?}");
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.live_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_checkout_releases_permit_and_slot() {
        let pool = missing_engine_pool(1);
        for _ in 0..3 {
            assert!(pool.checkout().await.is_err());
        }
        assert_eq!(pool.permits.available_permits(), 1);
        assert_eq!(pool.live_count(), 0);
    }

    #[tokio::test]
    async fn test_warm_up_propagates_spawn_failure() {
        let pool = missing_engine_pool(2);
        assert!(pool.warm_up(1).await.is_err());
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.permits.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_platform_table_entry_is_used() {
        let mut locator = EngineLocator::default();
        locator.insert(std::env::consts::FAMILY, "./no/such/stockfish");
        let pool = EnginePool::new(EngineSettings {
            locator,
            ..EngineSettings::for_executable("unused")
        });
        let err = pool.checkout().await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable { .. }), "got {err:?}");
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let pool = missing_engine_pool(0);
        assert_eq!(pool.permits.available_permits(), 1);
    }
}
