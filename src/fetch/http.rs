//! HTTP fetcher backed by reqwest.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{Fetcher, LoadResponse};
use crate::config::FetchConfig;
use crate::error::{DocError, Result};

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DocError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn fetch_error(specifier: &str, err: impl std::fmt::Display) -> DocError {
    DocError::Fetch {
        specifier: specifier.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, specifier: &str) -> Result<Option<LoadResponse>> {
        let url = reqwest::Url::parse(specifier)
            .map_err(|e| DocError::BadRequest(format!("invalid specifier {}: {}", specifier, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DocError::BadRequest(format!(
                "cannot fetch {} specifier {}",
                url.scheme(),
                specifier
            )));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(specifier, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(specifier, "remote source not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(fetch_error(specifier, format!("HTTP {}", status)));
        }

        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let content = response
            .text()
            .await
            .map_err(|e| fetch_error(specifier, e))?;

        Ok(Some(LoadResponse {
            specifier: final_url,
            content: content.into(),
            headers,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_http_specifiers() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("npm:preact@10").await.unwrap_err();
        assert!(matches!(err, DocError::BadRequest(_)));
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, DocError::BadRequest(_)));
    }
}
