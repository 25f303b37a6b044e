// src/source/http.rs
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::SourceError;

pub const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
pub const ACCEPT_JSON: &str = "application/json, text/plain, */*";

/// Shared HTTP client with browser-like default headers and a bounded timeout.
/// Cheap to clone.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(cfg: &HttpConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&cfg.accept_language)
                .map_err(|e| SourceError::Network(format!("bad accept-language header: {e}")))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs()))
            .connect_timeout(Duration::from_secs(cfg.timeout_secs().min(10)))
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and return the body. Non-2xx status is a network error.
    pub async fn get_text(
        &self,
        url: &str,
        accept: &str,
        referer: Option<&str>,
    ) -> Result<String, SourceError> {
        let mut req = self.client.get(url).header(ACCEPT, accept);
        if let Some(r) = referer {
            req = req.header(REFERER, r);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Network(format!("http status {status} from {url}")));
        }
        let body = resp.text().await?;
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}
