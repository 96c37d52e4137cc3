use crate::config::Config;
use crate::error::{ApplicationError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Anything that can hand back the HTML of a sound page.
#[async_trait]
pub(crate) trait PageSource {
    async fn request_text(&self, link: &Url) -> Result<String>;
}

/// Shared HTTP client for page fetches and downloads.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    page_timeout: Duration,
}

impl HttpClient {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            page_timeout: config.page_timeout,
        })
    }

    /// GET `link`, failing with [`ApplicationError::Http`] unless the server answers 200
    ///
    /// Only the wait for the response head is bounded by `wait`, the body is
    /// left to the caller.
    pub(crate) async fn get_ok(&self, link: &Url, wait: Duration) -> Result<reqwest::Response> {
        let resp = tokio::time::timeout(wait, self.client.get(link.clone()).send())
            .await
            .map_err(|_| ApplicationError::Stalled(wait))??;
        ensure_ok(link, resp)
    }
}

fn ensure_ok(link: &Url, resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status() != StatusCode::OK {
        return Err(ApplicationError::Http {
            url: link.clone(),
            status: resp.status(),
        });
    }
    Ok(resp)
}

#[async_trait]
impl PageSource for HttpClient {
    async fn request_text(&self, link: &Url) -> Result<String> {
        tracing::debug!(%link, "fetching page");
        let resp = self
            .client
            .get(link.clone())
            .timeout(self.page_timeout)
            .send()
            .await?;
        let text = ensure_ok(link, resp)?.text().await?;
        Ok(text)
    }
}
