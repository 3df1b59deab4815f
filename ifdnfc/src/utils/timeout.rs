//! Timeout helpers.
//!
//! The radio boundary speaks milliseconds (`u64`) while configuration keeps
//! `Duration`s; these helpers convert between the two.

use std::time::{Duration, Instant};

use crate::constants::{OPEN_RETRY_INTERVAL_SECS, TRANSCEIVE_TIMEOUT_MS};

/// Convert milliseconds to Duration.
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Duration as whole milliseconds, saturating at `u64::MAX`.
pub fn as_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Default relay timeout as Duration.
pub fn default_transceive_timeout() -> Duration {
    ms(TRANSCEIVE_TIMEOUT_MS)
}

/// Default minimum interval between reopen attempts.
pub fn default_open_retry_interval() -> Duration {
    Duration::from_secs(OPEN_RETRY_INTERVAL_SECS)
}

/// True once `interval` has passed since `since`; a missing timestamp
/// means no attempt was made yet.
pub fn elapsed_since(since: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match since {
        None => true,
        Some(t) => now.saturating_duration_since(t) >= interval,
    }
}
