use std::time::Duration;

use reqwest::{blocking::{Client, RequestBuilder}, redirect::Policy};

use crate::config::ProviderSettings;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("floodrisk/", env!("CARGO_PKG_VERSION"));

/// Shared blocking HTTP client. Created once by the caller and handed to every
/// provider; cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let inner = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(10))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Http { url: String::new(), reason: format!("failed to build client: {e}") })?;
        Ok(Self { inner })
    }

    #[inline] pub(crate) fn get(&self, url: &str) -> RequestBuilder { self.inner.get(url) }

    #[inline] pub(crate) fn post(&self, url: &str) -> RequestBuilder { self.inner.post(url) }

    /// Send a request and return the body of a successful (2xx) response.
    pub(crate) fn send_text(&self, url: &str, request: RequestBuilder) -> Result<String> {
        let http = |e: reqwest::Error| Error::Http { url: url.to_string(), reason: e.to_string() };
        request.send()
            .map_err(http)?
            .error_for_status()
            .map_err(http)?
            .text()
            .map_err(http)
    }
}
