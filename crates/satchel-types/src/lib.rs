//! Shared types for the Satchel session driver.
//!
//! The driver treats everything outside the session lifecycle as a
//! collaborator: where the token travels (cookies), who is asking
//! (request context), what time it is (clock) and how new tokens are minted
//! (id generator). Each collaborator is a small trait defined here, with a
//! system implementation for production use and an in-memory one for tests
//! and embedding.

pub mod clock;
pub mod defaults;
pub mod ids;
pub mod names;
pub mod request;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{IdGenerator, RandomIdGenerator, SequenceIdGenerator};
pub use names::is_collection_name;
pub use request::{
    CookieJar, CookieTransport, Fingerprint, RequestContext, StaticRequest, hash_ip_pair,
};
