//! Inbound frame rate limiting

use std::num::NonZeroU32;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

/// Per-connection limiter for inbound WebSocket frames. Owned by the
/// connection's read loop, so no sharing is needed.
pub struct FrameRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    dropped: u64,
}

impl FrameRateLimiter {
    /// A rate of zero is treated as one frame per second
    pub fn new(frames_per_second: u32) -> Self {
        let rate = NonZeroU32::new(frames_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            dropped: 0,
        }
    }

    /// Returns true if the frame may be processed
    pub fn check_frame(&mut self) -> bool {
        let allowed = self.limiter.check().is_ok();
        if !allowed {
            self.dropped += 1;
        }
        allowed
    }

    /// Frames refused so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
