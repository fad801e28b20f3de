//! Cooperative cancellation shared by the enrollment loop, the deadline
//! timer, and the user.
//!
//! The token is a one-way latch: the first request wins and every later
//! request is a no-op, so a timer firing after a user cancel (or the other
//! way round) never changes how the session is reported.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const IDLE: u8 = 0;
const REQUESTED: u8 = 0b01;
const TIMED_OUT: u8 = 0b10;

/// Clone-safe cancellation handle. Clones observe the same latch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<AtomicU8>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation on behalf of the user.
    ///
    /// Returns `true` if this call set the latch.
    pub fn cancel(&self) -> bool {
        self.latch(REQUESTED)
    }

    /// Request cancellation because the session deadline elapsed.
    ///
    /// Returns `true` if this call set the latch.
    pub fn timeout_cancel(&self) -> bool {
        self.latch(REQUESTED | TIMED_OUT)
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) & REQUESTED != 0
    }

    pub fn is_timeout_cancellation(&self) -> bool {
        self.state.load(Ordering::Acquire) & TIMED_OUT != 0
    }

    fn latch(&self, bits: u8) -> bool {
        self.state
            .compare_exchange(IDLE, bits, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
