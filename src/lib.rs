//! Client library for the Gravatar XML-RPC account API.
//!
//! The API lives at `https://secure.gravatar.com/xmlrpc?user=<hash>`, where
//! `<hash>` identifies the account: the lowercase hex MD5 digest of the
//! trimmed, CP1252-encoded account email. [`GravatarClient`] resolves that
//! endpoint once at construction and exposes one typed method per remote
//! procedure; see [`identity`] for the hashing rules and [`xmlrpc`] for the
//! wire layer.
//!
//! ```no_run
//! use gravatar_xmlrpc::{GravatarClient, Rating};
//!
//! fn main() -> Result<(), gravatar_xmlrpc::Error> {
//!     let client = GravatarClient::new("user@example.com", "hunter2")?;
//!     let image_id = client.upload_image_url("https://example.com/me.png", Rating::G)?;
//!     client.set_active_image(&image_id, &["user@example.com"])?;
//!     Ok(())
//! }
//! ```
//!
//! The password travels inside the XML-RPC payload, protected only by TLS;
//! it is never written to the log output.

pub mod error;
pub mod gravatar;
pub mod identity;
pub mod types;
pub mod xmlrpc;

pub use error::{Error, RemoteCallError, Result};
pub use gravatar::GravatarClient;
pub use types::{Address, Rating, UserImage};
pub use xmlrpc::client::DEFAULT_TIMEOUT;
pub use xmlrpc::encoding::Value;
