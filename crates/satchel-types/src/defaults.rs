//! Default configuration values shared between crates.

use std::time::Duration;

/// Cookie name used when none (or an unusable one) is configured.
pub const COOKIE_NAME: &str = "satcheldid";

/// Percentage chance that a write triggers a garbage-collection sweep.
pub const GC_PROBABILITY: u8 = 5;

/// Seconds of inactivity before a session expires.
pub const EXPIRATION_SECS: u64 = 7200;

/// Seconds between token rotations.
pub const ROTATION_SECS: u64 = 300;

pub const MATCH_IP: bool = false;
pub const MATCH_UA: bool = true;

/// Number of random bytes behind a session token (256 bits).
pub const TOKEN_BYTES: usize = 32;

pub fn expiration_time() -> Duration {
    Duration::from_secs(EXPIRATION_SECS)
}

pub fn rotation_time() -> Duration {
    Duration::from_secs(ROTATION_SECS)
}
