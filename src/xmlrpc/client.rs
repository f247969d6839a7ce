//! Blocking HTTP transport for XML-RPC calls.

use std::time::Duration;

use log::{debug, trace};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::xmlrpc::encoding::{ParserError, Value};
use crate::xmlrpc::protocol::{Fault, Request, Response};

/// Applied to every request unless the caller picks another value.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT_STRING: &str = concat!("gravatar-xmlrpc/", env!("CARGO_PKG_VERSION"));

/// Why a single remote call failed.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or protocol-level HTTP failure.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// The server answered, but not with 2xx.
    #[error("server returned HTTP {status}")]
    Http { status: StatusCode },

    /// The server reported an XML-RPC `<fault>`.
    #[error("remote fault: {0}")]
    Fault(#[from] Fault),

    /// The reply was not a well-formed `<methodResponse>`.
    #[error("malformed reply: {0}")]
    Parse(#[from] ParserError),

    /// The reply parsed, but its shape is not what the method documents.
    #[error("unexpected reply shape: {reason}")]
    Decode { reason: String },
}

impl RemoteCallError {
    fn from_http(err: reqwest::Error) -> RemoteCallError {
        if err.is_timeout() {
            RemoteCallError::Timeout
        } else {
            RemoteCallError::Transport(err)
        }
    }
}

pub struct Client {
    url: Url,
    http: HttpClient,
}

impl Client {
    pub fn new(url: Url, timeout: Duration) -> Result<Client, reqwest::Error> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Client { url, http })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Performs one call and returns the reply value.
    ///
    /// The request body is never logged: it carries the account password.
    pub fn remote_call(&self, request: &Request) -> Result<Value, RemoteCallError> {
        debug!("calling {} at {}", request.method(), self.url);

        let response = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/xml")
            .header(USER_AGENT, USER_AGENT_STRING)
            .body(request.body())
            .send()
            .map_err(RemoteCallError::from_http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteCallError::Http { status });
        }

        let body = response.text().map_err(RemoteCallError::from_http)?;
        trace!("{} replied with {} bytes", request.method(), body.len());

        Ok(Response::parse(&body)?.result()?)
    }
}
