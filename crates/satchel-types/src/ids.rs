//! Session token generation.

use std::collections::VecDeque;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use rand::RngCore;

use crate::defaults::TOKEN_BYTES;

/// Mints new session identifiers.
///
/// Implementations must be cryptographically strong: the identifier is the
/// only credential a client presents.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Generates URL-safe tokens from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn new_id(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Hands out a fixed sequence of identifiers, then falls back to random ones.
///
/// Useful for forcing id collisions or predictable tokens in tests.
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    queue: Mutex<VecDeque<String>>,
}

impl SequenceIdGenerator {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }

    /// Queue another identifier.
    pub fn push(&self, id: impl Into<String>) {
        self.queue.lock().push_back(id.into());
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn new_id(&self) -> String {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| RandomIdGenerator.new_id())
    }
}
