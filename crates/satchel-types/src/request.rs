//! Request-side collaborators: token transport and client identity.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Carries the session token between client and server.
///
/// Signing, encryption and cookie attributes are the transport's business;
/// the driver only reads the presented token and asks for a new one to be
/// sent back.
pub trait CookieTransport {
    /// The token presented with the current request, if any.
    fn get(&self) -> Option<String>;

    /// Send `token` back to the client with the response.
    fn set(&self, token: &str);
}

/// What the driver needs to know about the current request.
pub trait RequestContext {
    /// Address of the connecting peer.
    fn client_ip(&self) -> &str;

    /// Address reported by a trusted proxy, if different from the peer.
    fn real_ip(&self) -> &str {
        self.client_ip()
    }

    fn user_agent(&self) -> &str;
}

/// Client fingerprint captured at creation and on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub ip_hash: String,
    pub user_agent: String,
}

impl Fingerprint {
    pub fn of(request: &dyn RequestContext) -> Self {
        Self {
            ip_hash: hash_ip_pair(request.client_ip(), request.real_ip()),
            user_agent: request.user_agent().to_string(),
        }
    }
}

/// Hash the (peer, real) address pair into a lowercase hex SHA-256 digest.
pub fn hash_ip_pair(client_ip: &str, real_ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client_ip.as_bytes());
    hasher.update(real_ip.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// In-memory cookie slot.
///
/// Holds the presented token and records whatever the driver sends back.
#[derive(Debug, Default)]
pub struct CookieJar {
    presented: Option<String>,
    sent: Mutex<Option<String>>,
}

impl CookieJar {
    /// A request that carries no token.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A request presenting `token`.
    pub fn presenting(token: impl Into<String>) -> Self {
        Self {
            presented: Some(token.into()),
            sent: Mutex::new(None),
        }
    }

    /// The token most recently sent back to the client.
    pub fn sent(&self) -> Option<String> {
        self.sent.lock().clone()
    }
}

impl CookieTransport for CookieJar {
    fn get(&self) -> Option<String> {
        self.presented.clone()
    }

    fn set(&self, token: &str) {
        *self.sent.lock() = Some(token.to_string());
    }
}

/// Fixed request identity.
#[derive(Debug, Clone)]
pub struct StaticRequest {
    pub client_ip: String,
    pub real_ip: Option<String>,
    pub user_agent: String,
}

impl StaticRequest {
    pub fn new(client_ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client_ip: client_ip.into(),
            real_ip: None,
            user_agent: user_agent.into(),
        }
    }

    pub fn with_real_ip(mut self, real_ip: impl Into<String>) -> Self {
        self.real_ip = Some(real_ip.into());
        self
    }
}

impl RequestContext for StaticRequest {
    fn client_ip(&self) -> &str {
        &self.client_ip
    }

    fn real_ip(&self) -> &str {
        self.real_ip.as_deref().unwrap_or(&self.client_ip)
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
