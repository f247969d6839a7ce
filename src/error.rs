//! Error types surfaced to callers.

use thiserror::Error;

pub use crate::xmlrpc::client::RemoteCallError;

/// Top-level error for client construction and façade operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The endpoint URL or the HTTP stack could not be set up. Raised once,
    /// at client construction.
    #[error("client configuration failed: {reason}")]
    Configuration { reason: String },

    /// A remote call failed: transport, timeout, remote fault, or a reply
    /// the decoder does not recognize.
    #[error("{method} failed: {source}")]
    RemoteCall {
        method: &'static str,
        #[source]
        source: RemoteCallError,
    },

    /// The service accepted the call but rejected the image. This is a
    /// successful RPC with a failure payload, not a transport problem.
    #[error("{method} rejected the image upload")]
    UploadFailed { method: &'static str },

    /// An operation that needs at least one email address was given none.
    /// Detected before any network I/O.
    #[error("{method} requires at least one email address")]
    NoAddresses { method: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
