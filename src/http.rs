//! Low-level HTTP request execution
//!
//! One shared [`reqwest::Client`] carries the fixed desktop User-Agent and
//! the 30-second per-attempt timeout. Connection resets are re-issued after
//! a constant delay, up to the configured attempt budget; a timeout is
//! terminal, and every other transport error propagates immediately.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::retry_with_delay;
use reqwest::RequestBuilder;

/// Executes single HTTP requests with bounded connection-reset retry
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpExecutor {
    /// Build an executor from the library configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
        })
    }

    /// The underlying client, for endpoints that stream response bodies
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Issue a request, re-issuing it on connection reset
    ///
    /// Each retry is a full re-issue of the same request, including any
    /// body; [`Error`]'s retryability classification limits retries to
    /// connection resets, so timeouts and other transport errors fail
    /// immediately. Returns the response as soon as headers arrive; callers
    /// check the status and read the body themselves.
    pub async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        retry_with_delay(&self.retry, || async {
            let req = request.try_clone().ok_or_else(|| Error::Config {
                message: "request body is not cloneable for retry".to_string(),
            })?;

            match req.send().await {
                Ok(response) => Ok(response),
                Err(e) if e.is_timeout() => {
                    tracing::error!(error = %e, "Request timed out");
                    Err(Error::Timeout)
                }
                Err(e) => Err(Error::Network(e)),
            }
        })
        .await
    }

    /// Issue a request and buffer the full response body
    ///
    /// Returns the status code and the accumulated body bytes.
    pub async fn execute_buffered(&self, request: RequestBuilder) -> Result<(u16, Vec<u8>)> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Network(e)
            }
        })?;
        Ok((status, body.to_vec()))
    }
}
