//! Timing between trades.
//!
//! Randomized inter-trade sleeps plus the two fixed backoffs the
//! controller uses (empty wallet, failed cycle).

use rand::Rng;
use std::time::Duration;

/// Wait before re-checking a wallet that holds neither token.
pub const EMPTY_WALLET_BACKOFF: Duration = Duration::from_secs(60);

/// Wait after a cycle fails before starting the next one.
pub const FAILED_CYCLE_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacingError {
    #[error("min sleep must be at least 1 second (got {0})")]
    MinTooSmall(u64),

    #[error("max sleep ({max}s) must be greater than min sleep ({min}s)")]
    MaxNotAboveMin { min: u64, max: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    min_sleep_secs: u64,
    max_sleep_secs: u64,
    pub empty_wallet_backoff: Duration,
    pub failed_cycle_backoff: Duration,
}

impl Pacing {
    /// Validates `max > min >= 1`.
    pub fn new(min_sleep_secs: u64, max_sleep_secs: u64) -> Result<Self, PacingError> {
        if min_sleep_secs < 1 {
            return Err(PacingError::MinTooSmall(min_sleep_secs));
        }
        if max_sleep_secs <= min_sleep_secs {
            return Err(PacingError::MaxNotAboveMin {
                min: min_sleep_secs,
                max: max_sleep_secs,
            });
        }

        Ok(Self {
            min_sleep_secs,
            max_sleep_secs,
            empty_wallet_backoff: EMPTY_WALLET_BACKOFF,
            failed_cycle_backoff: FAILED_CYCLE_BACKOFF,
        })
    }

    pub fn min_sleep_secs(&self) -> u64 {
        self.min_sleep_secs
    }

    pub fn max_sleep_secs(&self) -> u64 {
        self.max_sleep_secs
    }

    /// Uniform integer draw over `[min, max]`, inclusive on both ends.
    pub fn draw_sleep_secs<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min_sleep_secs..=self.max_sleep_secs)
    }

    pub fn next_sleep(&self) -> Duration {
        Duration::from_secs(self.draw_sleep_secs(&mut rand::thread_rng()))
    }
}

impl Default for Pacing {
    /// 10–30 seconds.
    fn default() -> Self {
        Self {
            min_sleep_secs: 10,
            max_sleep_secs: 30,
            empty_wallet_backoff: EMPTY_WALLET_BACKOFF,
            failed_cycle_backoff: FAILED_CYCLE_BACKOFF,
        }
    }
}
