//! Record validation on read.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use satchel_config::SessionConfig;
use satchel_store::SessionRecord;
use satchel_types::Fingerprint;

/// Why a stored record cannot be used for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidity {
    /// Inactive for longer than the expiration window.
    Expired,
    /// Client address changed and `match_ip` is on.
    IpMismatch,
    /// User agent changed and `match_ua` is on.
    UserAgentMismatch,
    /// The stored payload could not be decoded.
    Corrupt,
}

impl Invalidity {
    pub fn as_str(self) -> &'static str {
        match self {
            Invalidity::Expired => "expired",
            Invalidity::IpMismatch => "ip_mismatch",
            Invalidity::UserAgentMismatch => "user_agent_mismatch",
            Invalidity::Corrupt => "corrupt_payload",
        }
    }
}

impl fmt::Display for Invalidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check `record` against expiry and the client fingerprint.
pub fn validate(
    config: &SessionConfig,
    record: &SessionRecord,
    fingerprint: &Fingerprint,
    now: DateTime<Utc>,
) -> Result<(), Invalidity> {
    if is_expired(record.updated, config.expiration_time, now) {
        return Err(Invalidity::Expired);
    }
    if config.match_ip && record.ip_hash != fingerprint.ip_hash {
        return Err(Invalidity::IpMismatch);
    }
    if config.match_ua && record.user_agent != fingerprint.user_agent {
        return Err(Invalidity::UserAgentMismatch);
    }
    Ok(())
}

/// A session last written at `updated` is expired once `updated + expiration <= now`.
pub fn is_expired(updated: DateTime<Utc>, expiration: Duration, now: DateTime<Utc>) -> bool {
    match updated.checked_add_signed(span(expiration)) {
        Some(deadline) => deadline <= now,
        None => false,
    }
}

/// `now - expiration`: records updated strictly before this are expired.
pub fn expiry_threshold(expiration: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_signed(span(expiration))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub(crate) fn span(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
