// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::config::FetchConfig;
use crate::error::TransportError;
use crate::query::SearchRequest;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use tracing::debug;

/// Gets a page body. One attempt per call; retrying is the caller's business.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &SearchRequest) -> Result<String, TransportError>;

    /// Plain GET of an arbitrary URL (rosters and the like).
    async fn fetch_url(&self, url: &str) -> Result<String, TransportError>;
}

/// reqwest-backed fetcher. Owns its client; open it once and hand it to the engine.
pub struct HttpFetcher {
    client: Client,
    timeout_seconds: u64,
}

impl HttpFetcher {
    pub fn open(config: &FetchConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .redirect(redirect::Policy::limited(config.max_redirects));
        if let Some(user_agent) = config.pick_user_agent() {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client, timeout_seconds: config.timeout_seconds })
    }

    /// Drops the connection pool.
    pub fn close(self) {
        debug!("closing http client");
    }

    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, self.timeout_seconds, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, self.timeout_seconds, e))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &SearchRequest) -> Result<String, TransportError> {
        debug!(url = %request.url(), "fetching search page");
        self.get(&request.endpoint, &request.params).await
    }

    async fn fetch_url(&self, url: &str) -> Result<String, TransportError> {
        debug!(%url, "fetching");
        self.get(url, &[]).await
    }
}
