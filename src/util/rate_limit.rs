//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Operator messages per second accepted from one connection
pub const COMMAND_RATE_LIMIT: u32 = 20;

/// Per-connection rate limiter for operator commands
#[derive(Clone)]
pub struct ClientRateLimiter {
    command_limiter: Arc<Limiter>,
}

impl ClientRateLimiter {
    pub fn new() -> Self {
        Self::with_rate(COMMAND_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            command_limiter: create_limiter(per_second),
        }
    }

    /// Check if a command is allowed (returns true if allowed)
    pub fn check_command(&self) -> bool {
        self.command_limiter.check().is_ok()
    }
}

impl Default for ClientRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
