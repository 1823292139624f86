//! Forwarded connection pairs: identity and lifetime tracking.
//!
//! Each accepted caller and the backend connection dialed for it form one
//! pair. The pair gets an ID for log correlation and a guard that keeps the
//! active count honest however the handling task ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Relaxed is enough: only uniqueness matters.
static PAIR_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(u64);

impl PairId {
    pub fn new() -> Self {
        Self(PAIR_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for PairId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pair-{}", self.0)
    }
}

/// Where a pair is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    /// Caller accepted, backend being dialed.
    Dialing,
    /// Both connections live, bytes flowing.
    Relaying,
    /// Both connections closed.
    Closed,
}

impl std::fmt::Display for PairState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PairState::Dialing => "dialing",
            PairState::Relaying => "relaying",
            PairState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counts live pairs so shutdown can wait for them.
#[derive(Debug, Clone, Default)]
pub struct PairTracker {
    active: Arc<AtomicU64>,
}

impl PairTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pair. The returned guard decrements on drop.
    pub fn track(&self) -> PairGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        PairGuard {
            active: Arc::clone(&self.active),
            id: PairId::new(),
            state: PairState::Dialing,
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no pair is live or `deadline` passes. Returns whether idle.
    pub async fn wait_idle(&self, deadline: Duration) -> bool {
        let poll = async {
            while self.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(deadline, poll).await.is_ok()
    }
}

/// Tracks one pair's lifetime.
#[derive(Debug)]
pub struct PairGuard {
    active: Arc<AtomicU64>,
    id: PairId,
    state: PairState,
}

impl PairGuard {
    pub fn id(&self) -> PairId {
        self.id
    }

    pub fn state(&self) -> PairState {
        self.state
    }

    pub fn set_state(&mut self, state: PairState) {
        tracing::trace!(pair_id = %self.id, from = %self.state, to = %state, "Pair state change");
        self.state = state;
    }
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(pair_id = %self.id, "Pair released");
    }
}
