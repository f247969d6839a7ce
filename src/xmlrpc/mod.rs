//! Minimal XML-RPC support: value encoding, call framing and a blocking
//! HTTP transport.
//!
//! Protocol reference: <http://xmlrpc.scripting.com/spec.html>.

pub mod client;
pub mod encoding;
pub mod protocol;
