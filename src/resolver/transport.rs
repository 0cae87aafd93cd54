use crate::resolver::{
    errors::TransportError,
    pipeline::process_response,
    types::{PageResponse, ProbeResponse},
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header::HeaderValue};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const MAX_REDIRECTS: usize = 10;
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Outbound HTTP capability used by the resolver.
///
/// Both operations follow redirects and report the final URL they ended on.
/// Non-2xx statuses are returned as responses, not errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Header-only request.
    async fn head(&self, url: &Url) -> Result<ProbeResponse, TransportError>;

    /// Full request, body decoded to UTF-8.
    async fn get(&self, url: &Url) -> Result<PageResponse, TransportError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static(ACCEPT));

        let client = ClientBuilder::new()
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip_all, fields(url = %url))]
    async fn head(&self, url: &Url) -> Result<ProbeResponse, TransportError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(TransportError::from_reqwest_error)?;

        debug!(status = %response.status(), final_url = %response.url(), "probe finished");

        Ok(ProbeResponse {
            url_final: response.url().clone(),
            status: response.status(),
            headers: response.headers().clone(),
        })
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn get(&self, url: &Url) -> Result<PageResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(TransportError::from_reqwest_error)?;

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(TransportError::BodyTooLarge(content_length));
        }

        let final_url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();

        let body_bytes = response
            .bytes()
            .await
            .map_err(TransportError::from_reqwest_error)?;

        // Content-Length may be missing or compressed
        if body_bytes.len() as u64 > MAX_BODY_SIZE {
            return Err(TransportError::BodyTooLarge(body_bytes.len() as u64));
        }

        debug!(%status, final_url = %final_url, size = body_bytes.len(), "fetch finished");

        Ok(process_response(final_url, status, &headers, &body_bytes))
    }
}
