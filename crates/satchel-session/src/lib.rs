//! Document-backed request sessions.
//!
//! This crate drives a session through its lifecycle on top of a
//! [`SessionStore`](satchel_store::SessionStore):
//! - Token lookup with fallback to the pre-rotation id
//! - Expiry and client fingerprint validation
//! - Token rotation on a schedule or on demand
//! - Conflict-safe writes through a single atomic replace
//! - Probabilistic inline garbage collection
//!
//! # Example
//!
//! ```rust,ignore
//! use satchel_session::{SessionDriver, SessionLifecycle};
//!
//! let driver = SessionDriver::open(config)?;
//! let mut session = driver.start(&cookies, &request);
//! session.read(false)?;
//! session.set("user_id", 42);
//! session.write()?;
//! ```

pub mod codec;
mod error;
pub mod gc;
mod lifecycle;
pub mod rotation;
pub mod validate;

pub use codec::{CodecError, Map};
pub use error::{Error, Result};
pub use gc::GarbageCollector;
pub use lifecycle::{SessionDriver, SessionLifecycle, SessionState, StoreSession, WriteOutcome};
pub use validate::{Invalidity, validate};
