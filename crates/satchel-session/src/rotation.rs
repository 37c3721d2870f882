//! Token rotation.

use chrono::{DateTime, Utc};
use satchel_config::RotationPolicy;
use satchel_store::SessionKeys;

use crate::validate::span;

/// Whether a token minted at `created` should be replaced at `now`.
pub fn is_due(policy: RotationPolicy, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match policy {
        RotationPolicy::Never => false,
        RotationPolicy::EveryWrite => true,
        RotationPolicy::Interval(every) => match created.checked_add_signed(span(every)) {
            Some(due_at) => due_at <= now,
            None => false,
        },
    }
}

/// Swap in `new_id`, remembering the outgoing token as `previous_id`.
///
/// The rotated token starts a new interval, so `created` is re-stamped.
pub fn rotate(keys: &mut SessionKeys, new_id: String, now: DateTime<Utc>) {
    keys.previous_id = std::mem::replace(&mut keys.session_id, new_id);
    keys.created = now;
    keys.updated = now;
}
