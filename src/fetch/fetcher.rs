use crate::model::FetchError;
use crate::fetch::traits::{Fetcher, PageRequest};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }

    fn build_headers(req: &PageRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &req.headers {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.insert(HeaderName::from_static(*name), v);
                }
                Err(_) => warn!("Dropping invalid header value for {}: {:?}", name, value),
            }
        }
        headers
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: &PageRequest) -> Result<String, FetchError> {
        debug!("GET {}", req.url);
        let response = self
            .client
            .get(&req.url)
            .headers(Self::build_headers(req))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Error pages are still parsed; the extractors will just come up empty.
            warn!("Non-success status {} for {}", status, req.url);
        }

        Ok(response.text().await?)
    }
}
