//! Typed façade over the Gravatar XML-RPC API.
//!
//! One method per remote procedure. Every call sends a single struct
//! parameter holding the account password plus the call-specific fields;
//! that struct is built fresh per call, so concurrent calls on one client
//! never see each other's parameters.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identity;
use crate::types::{Address, Rating, UserImage};
use crate::xmlrpc::client::{Client as XmlRpcClient, RemoteCallError, DEFAULT_TIMEOUT};
use crate::xmlrpc::encoding::{Struct, Value};
use crate::xmlrpc::protocol::Request;

// Parameter names fixed by the remote API.
const PASSWORD: &str = "password";
const HASHES: &str = "hashes";
const DATA: &str = "data";
const RATING: &str = "rating";
const IMAGE_URL: &str = "url";
const USER_IMAGE: &str = "userimage";
const ADDRESSES: &str = "addresses";

/// Client bound to one Gravatar account.
///
/// The account email is hashed once at construction to form the per-account
/// endpoint; email, hash and password are immutable for the life of the
/// client. All methods take `&self` and may be called from multiple threads.
pub struct GravatarClient {
    email: String,
    hash: String,
    password: String,
    rpc: XmlRpcClient,
}

impl GravatarClient {
    /// Connects to the production endpoint with the default timeout.
    pub fn new(email: &str, password: &str) -> Result<GravatarClient> {
        Self::with_endpoint(identity::GRAVATAR_XML_RPC_URL, email, password, DEFAULT_TIMEOUT)
    }

    /// Connects to the production endpoint with a caller-chosen timeout.
    pub fn with_timeout(email: &str, password: &str, timeout: Duration) -> Result<GravatarClient> {
        Self::with_endpoint(identity::GRAVATAR_XML_RPC_URL, email, password, timeout)
    }

    /// Connects to an arbitrary base URL. The account hash is still appended
    /// as the `user` query parameter.
    pub fn with_endpoint(
        base_url: &str,
        email: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<GravatarClient> {
        let (endpoint, hash) = identity::resolve(base_url, email).map_err(|err| {
            Error::Configuration {
                reason: format!("invalid endpoint URL: {}", err),
            }
        })?;
        let rpc = XmlRpcClient::new(endpoint, timeout).map_err(|err| Error::Configuration {
            reason: format!("HTTP client setup failed: {}", err),
        })?;
        debug!("resolved account {} to hash {}", email, hash);
        Ok(GravatarClient {
            email: email.to_string(),
            hash,
            password: password.to_string(),
            rpc,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Lowercase hex MD5 hash identifying the account.
    pub fn email_hash(&self) -> &str {
        &self.hash
    }

    /// The resolved per-account endpoint.
    pub fn endpoint(&self) -> &Url {
        self.rpc.url()
    }

    /// Checks which of the given email addresses have a Gravatar.
    pub fn check_exists(&self, emails: &[&str]) -> Result<HashMap<String, bool>> {
        const METHOD: &str = "grav.exists";
        trace!("check_exists - emails: {:?}", emails);
        if emails.is_empty() {
            return Err(Error::NoAddresses { method: METHOD });
        }

        let mut hash_to_email = HashMap::new();
        for email in emails {
            hash_to_email.insert(identity::email_hash(email), (*email).to_string());
        }

        let mut params = self.base_params();
        let hashes: Vec<Value> = hash_to_email
            .keys()
            .map(|hash| Value::from(hash.as_str()))
            .collect();
        params.insert(HASHES.to_string(), Value::Array(hashes));

        let reply = self.call(METHOD, params)?;
        let members = reply
            .as_struct()
            .ok_or_else(|| Self::decode_error(METHOD, "expected a struct of hash flags"))?;

        let mut out = HashMap::new();
        for (hash, flag) in members {
            let Some(email) = hash_to_email.get(hash) else {
                continue;
            };
            let count = flag.as_i32().ok_or_else(|| {
                Self::decode_error(METHOD, format!("non-integer flag for {}", hash))
            })?;
            out.insert(email.clone(), count != 0);
        }
        // Addresses the service did not echo back are reported as absent.
        for email in hash_to_email.values() {
            out.entry(email.clone()).or_insert(false);
        }
        Ok(out)
    }

    /// Checks whether a single email address has a Gravatar.
    pub fn exists(&self, email: &str) -> Result<bool> {
        const METHOD: &str = "grav.exists";
        trace!("exists - email: {:?}", email);
        let hash = identity::email_hash(email);

        let mut params = self.base_params();
        params.insert(
            HASHES.to_string(),
            Value::Array(vec![Value::from(hash.as_str())]),
        );

        let reply = self.call(METHOD, params)?;
        let members = reply
            .as_struct()
            .ok_or_else(|| Self::decode_error(METHOD, "expected a struct of hash flags"))?;
        Ok(members
            .get(&hash)
            .and_then(Value::as_i32)
            .map_or(false, |count| count != 0))
    }

    /// Lists the addresses on the account and their active images.
    pub fn addresses(&self) -> Result<HashMap<String, Address>> {
        const METHOD: &str = "grav.addresses";
        trace!("addresses");
        let reply = self.call(METHOD, self.base_params())?;
        let members = reply
            .as_struct()
            .ok_or_else(|| Self::decode_error(METHOD, "expected a struct of address records"))?;

        let mut out = HashMap::new();
        for (email, record) in members {
            let address = Address::from_value(record).ok_or_else(|| {
                Self::decode_error(METHOD, format!("bad record for {}", email))
            })?;
            out.insert(email.clone(), address);
        }
        Ok(out)
    }

    /// Lists just the email addresses associated with the account.
    pub fn address_emails(&self) -> Result<Vec<String>> {
        Ok(self.addresses()?.into_keys().collect())
    }

    /// The currently active image for one of the account's addresses.
    pub fn current_image(&self, email: &str) -> Result<UserImage> {
        const METHOD: &str = "grav.addresses";
        trace!("current_image - email: {:?}", email);
        let mut addresses = self.addresses()?;
        let record = addresses
            .remove(email)
            .ok_or_else(|| Self::decode_error(METHOD, format!("no record for {}", email)))?;
        Ok(UserImage {
            id: record.image_id,
            rating: record.rating,
            url: Some(record.image_url),
        })
    }

    /// Lists every image stored on the account, keyed by image id.
    pub fn images(&self) -> Result<HashMap<String, UserImage>> {
        const METHOD: &str = "grav.userimages";
        trace!("images");
        let reply = self.call(METHOD, self.base_params())?;
        let members = reply
            .as_struct()
            .ok_or_else(|| Self::decode_error(METHOD, "expected a struct of image entries"))?;

        let mut out = HashMap::new();
        for (id, entry) in members {
            let image = UserImage::from_entry(id, entry).ok_or_else(|| {
                Self::decode_error(METHOD, format!("bad entry for image {}", id))
            })?;
            out.insert(id.clone(), image);
        }
        Ok(out)
    }

    /// Uploads a base64-encoded image to the account.
    ///
    /// The image is stored but not activated for any address; see
    /// [`GravatarClient::set_active_image`]. Returns the new image id.
    pub fn upload_image_data(&self, base64_data: &str, rating: Rating) -> Result<String> {
        const METHOD: &str = "grav.saveData";
        trace!("upload_image_data - rating: {}", rating);
        let mut params = self.base_params();
        params.insert(DATA.to_string(), Value::from(base64_data));
        params.insert(RATING.to_string(), Value::Int(rating.code()));
        self.save_image(METHOD, params)
    }

    /// Uploads raw image bytes, base64-encoding them first.
    pub fn upload_image_bytes(&self, bytes: &[u8], rating: Rating) -> Result<String> {
        self.upload_image_data(&BASE64.encode(bytes), rating)
    }

    /// Asks the service to download and store the image behind `image_url`.
    pub fn upload_image_url(&self, image_url: &str, rating: Rating) -> Result<String> {
        const METHOD: &str = "grav.saveUrl";
        trace!("upload_image_url - url: {:?} - rating: {}", image_url, rating);
        let mut params = self.base_params();
        params.insert(IMAGE_URL.to_string(), Value::from(image_url));
        params.insert(RATING.to_string(), Value::Int(rating.code()));
        self.save_image(METHOD, params)
    }

    /// Activates a stored image for one or more addresses on the account.
    /// Returns a per-address success flag.
    pub fn set_active_image(
        &self,
        image_id: &str,
        emails: &[&str],
    ) -> Result<HashMap<String, bool>> {
        const METHOD: &str = "grav.useUserimage";
        trace!("set_active_image - image: {:?} - emails: {:?}", image_id, emails);
        if emails.is_empty() {
            return Err(Error::NoAddresses { method: METHOD });
        }

        let mut params = self.base_params();
        params.insert(USER_IMAGE.to_string(), Value::from(image_id));
        params.insert(ADDRESSES.to_string(), Self::address_list(emails));
        let reply = self.call(METHOD, params)?;
        Self::decode_flags(METHOD, &reply)
    }

    /// Activates a stored image for the account's own email address.
    pub fn set_account_image(&self, image_id: &str) -> Result<bool> {
        const METHOD: &str = "grav.useUserimage";
        let flags = self.set_active_image(image_id, &[self.email.as_str()])?;
        flags
            .into_values()
            .next()
            .ok_or_else(|| Self::decode_error(METHOD, "empty flag map"))
    }

    /// Deactivates the active image for one or more addresses; each reverts
    /// to the default image. Not reversible through this library.
    pub fn remove_active_image(&self, emails: &[&str]) -> Result<HashMap<String, bool>> {
        const METHOD: &str = "grav.removeImage";
        trace!("remove_active_image - emails: {:?}", emails);
        if emails.is_empty() {
            return Err(Error::NoAddresses { method: METHOD });
        }

        let mut params = self.base_params();
        params.insert(ADDRESSES.to_string(), Self::address_list(emails));
        let reply = self.call(METHOD, params)?;
        Self::decode_flags(METHOD, &reply)
    }

    /// Permanently deletes a stored image from the account.
    pub fn delete_image(&self, image_id: &str) -> Result<bool> {
        const METHOD: &str = "grav.deleteUserimage";
        trace!("delete_image - image: {:?}", image_id);
        let mut params = self.base_params();
        params.insert(USER_IMAGE.to_string(), Value::from(image_id));
        let reply = self.call(METHOD, params)?;
        reply
            .as_bool()
            .ok_or_else(|| Self::decode_error(METHOD, "expected a boolean"))
    }

    /// Calls the API's echo method. Verifies credentials and connectivity
    /// without touching account state; returns the reply struct verbatim.
    pub fn test_connection(&self) -> Result<Struct> {
        const METHOD: &str = "grav.test";
        trace!("test_connection");
        let reply = self.call(METHOD, self.base_params())?;
        match reply {
            Value::Struct(members) => Ok(members),
            _ => Err(Self::decode_error(METHOD, "expected a struct")),
        }
    }

    /// A fresh parameter struct holding only the password. Each operation
    /// layers its own fields on a new copy; nothing call-specific is ever
    /// stored on the client.
    fn base_params(&self) -> Struct {
        let mut params = Struct::new();
        params.insert(PASSWORD.to_string(), Value::from(self.password.as_str()));
        params
    }

    fn call(&self, method: &'static str, params: Struct) -> Result<Value> {
        let request = Request::new(method).argument(Value::Struct(params));
        self.rpc
            .remote_call(&request)
            .map_err(|source| Error::RemoteCall { method, source })
    }

    fn address_list(emails: &[&str]) -> Value {
        Value::Array(emails.iter().map(|email| Value::from(*email)).collect())
    }

    fn decode_flags(method: &'static str, reply: &Value) -> Result<HashMap<String, bool>> {
        let members = reply.as_struct().ok_or_else(|| {
            Self::decode_error(method, "expected a struct of per-address flags")
        })?;
        let mut out = HashMap::new();
        for (email, flag) in members {
            let ok = flag.as_bool().ok_or_else(|| {
                Self::decode_error(method, format!("non-boolean flag for {}", email))
            })?;
            out.insert(email.clone(), ok);
        }
        Ok(out)
    }

    fn save_image(&self, method: &'static str, params: Struct) -> Result<String> {
        let reply = self.call(method, params)?;
        let id = reply
            .as_str()
            .ok_or_else(|| Self::decode_error(method, "expected an image id string"))?;
        // The service signals a rejected upload with the literal id "0".
        if id == "0" {
            return Err(Error::UploadFailed { method });
        }
        debug!("{} stored image {}", method, id);
        Ok(id.to_string())
    }

    fn decode_error(method: &'static str, reason: impl Into<String>) -> Error {
        Error::RemoteCall {
            method,
            source: RemoteCallError::Decode {
                reason: reason.into(),
            },
        }
    }
}

// The password never appears in debug output.
impl fmt::Debug for GravatarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GravatarClient")
            .field("email", &self.email)
            .field("hash", &self.hash)
            .field("password", &"<redacted>")
            .field("endpoint", &self.rpc.url().as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> GravatarClient {
        GravatarClient::with_endpoint(
            "http://127.0.0.1:9/",
            "test@example.com",
            "s3cret",
            DEFAULT_TIMEOUT,
        )
        .unwrap()
    }

    #[test]
    fn construction_resolves_hash_and_endpoint() {
        let client = offline_client();
        assert_eq!(client.email(), "test@example.com");
        assert_eq!(client.email_hash(), "55502f40dc8b7c769880b10874abc9d0");
        assert_eq!(
            client.endpoint().query(),
            Some("user=55502f40dc8b7c769880b10874abc9d0")
        );
    }

    #[test]
    fn construction_rejects_bad_endpoint() {
        let result = GravatarClient::with_endpoint(
            "::not-a-url::",
            "test@example.com",
            "s3cret",
            DEFAULT_TIMEOUT,
        );
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn debug_output_redacts_the_password() {
        let printed = format!("{:?}", offline_client());
        assert!(printed.contains("test@example.com"));
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn empty_address_lists_are_rejected_before_any_io() {
        let client = offline_client();
        assert!(matches!(
            client.check_exists(&[]),
            Err(Error::NoAddresses { method: "grav.exists" })
        ));
        assert!(matches!(
            client.set_active_image("abc", &[]),
            Err(Error::NoAddresses { method: "grav.useUserimage" })
        ));
        assert!(matches!(
            client.remove_active_image(&[]),
            Err(Error::NoAddresses { method: "grav.removeImage" })
        ));
    }

    #[test]
    fn base_params_is_rebuilt_per_call() {
        let client = offline_client();
        let mut first = client.base_params();
        first.insert(RATING.to_string(), Value::Int(1));
        let second = client.base_params();
        assert!(!second.contains_key(RATING));
        assert!(second.contains_key(PASSWORD));
    }
}
