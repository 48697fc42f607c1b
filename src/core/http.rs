//! HTTP transport used by the locator and the retriever.
//!
//! The [`HttpClient`] trait keeps the protocol code testable: production
//! uses [`ReqwestClient`], tests script replies with `MockHttpClient`.

use crate::error::{Result, UupError};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("uupwatch/", env!("CARGO_PKG_VERSION"));

/// Package downloads can be large and slow to assemble upstream.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub trait HttpClient {
    /// Performs a GET and returns the body of a successful response.
    fn get(&self, url: &str) -> Result<Vec<u8>>;

    /// Submits `form` as `application/x-www-form-urlencoded` and returns the
    /// body of a successful response.
    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Vec<u8>>;
}

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UupError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn read_body(url: &str, response: Response) -> Result<Vec<u8>> {
        check_status(url, response.status())?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| UupError::transport_error(url, format!("failed to read body: {e}")))
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| UupError::transport_error(url, e.to_string()))?;
        Self::read_body(url, response)
    }

    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Vec<u8>> {
        debug!(url, fields = form.len(), "POST");
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .map_err(|e| UupError::transport_error(url, e.to_string()))?;
        Self::read_body(url, response)
    }
}

/// Maps a response status onto the error taxonomy.
pub fn check_status(url: &str, status: StatusCode) -> Result<()> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(UupError::RateLimited {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(UupError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}
