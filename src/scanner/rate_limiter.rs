//! Rate limiting for task dispatch.
//!
//! Paces task submission to evenly spaced slots. The limiter gates the
//! orchestrator, not the workers, so achieved throughput is bounded by
//! whichever is slower.

use crate::error::{ScanError, ScanResult};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A rate limiter granting at most `rate` slots per second.
///
/// The burst size is one, so slots are spaced `1 / rate` apart instead of
/// being released in a batch at the start of every second.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    rate: NonZeroU32,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("rate", &self.rate).finish()
    }
}

impl RateLimiter {
    /// Create a limiter for `rate` slots per second.
    ///
    /// Returns `None` for a rate of 0, which means "unlimited": callers skip
    /// the gate entirely instead of holding a limiter.
    pub fn new(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        let quota = Quota::per_second(rate).allow_burst(nonzero!(1u32));

        Some(Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
            rate,
        })
    }

    /// Configured slots per second.
    pub fn rate(&self) -> u32 {
        self.rate.get()
    }

    /// Wait for the next slot.
    ///
    /// Fails with `Cancelled` if `cancel` fires before the slot is granted.
    pub async fn await_slot(&self, cancel: &CancellationToken) -> ScanResult<()> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }
}
