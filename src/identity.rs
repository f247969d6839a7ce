//! Account identity and endpoint resolution.
//!
//! A Gravatar account is addressed by the MD5 digest of its email. The
//! service hashes the CP1252 encoding of the address, not UTF-8, so emails
//! containing Western-European characters must go through the legacy code
//! page to produce a matching digest.

use encoding_rs::WINDOWS_1252;
use md5::{Digest, Md5};
use url::Url;

/// Production endpoint; the account hash is appended as the `user` query
/// parameter.
pub const GRAVATAR_XML_RPC_URL: &str = "https://secure.gravatar.com/xmlrpc";

/// Hashes an account email: trim, CP1252-encode, MD5, lowercase hex.
///
/// Deterministic, and deliberately case-sensitive: the service does not fold
/// case before hashing, so `Foo@example.com` and `foo@example.com` are
/// distinct accounts as far as this API is concerned.
pub fn email_hash(email: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(encode_cp1252(email.trim()));
    hex::encode(hasher.finalize())
}

/// Builds the per-account endpoint from a base URL, returning it together
/// with the account hash.
pub fn resolve(base_url: &str, email: &str) -> Result<(Url, String), url::ParseError> {
    let hash = email_hash(email);
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut().clear().append_pair("user", &hash);
    Ok((url, hash))
}

/// CP1252 bytes of `text`. Characters outside the code page become `?`,
/// never multi-byte HTML entities, so the digest stays one byte per char.
fn encode_cp1252(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if !had_errors {
        return bytes.into_owned();
    }
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let (encoded, _, bad) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if bad {
            out.push(b'?');
        } else {
            out.extend_from_slice(&encoded);
        }
    }
    out
}
