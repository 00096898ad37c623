//! Collection registry (SynBioHub) abstraction.
//!
//! The daemon only needs to know whether the target collection exists before
//! it starts reconciling; everything else the registry does is the
//! reconciler's business.
//!
//! - `collection_exists()` and `collection_id()` are fallible remote calls
//! - `restart()` re-arms the accessor (drops cached login state) and never
//!   fails

mod http;
mod mock;

pub use http::HttpRegistry;
pub use mock::MockRegistry;

use async_trait::async_trait;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed (connect, timeout, body).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a status that is neither success nor 404.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Login was rejected.
    #[error("login rejected for {login} (status {status})")]
    LoginRejected {
        /// Account login.
        login: String,
        /// HTTP status code.
        status: u16,
    },

    /// A required setting is missing.
    #[error("registry not configured: {0} is required")]
    NotConfigured(&'static str),

    /// Registry unreachable or refused the call.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Access to the collection registry.
#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Check whether the target collection exists.
    async fn collection_exists(&self) -> Result<bool, RegistryError>;

    /// Identifier of the target collection, if known.
    async fn collection_id(&self) -> Result<Option<String>, RegistryError>;

    /// Reset any cached session or backoff state.
    fn restart(&self);
}
