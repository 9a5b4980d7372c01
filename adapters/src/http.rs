//! HTTP plumbing shared by the provider adapters

use crate::{
    classifier::{self, ProviderErrorBody, RefusalMessages},
    connector::ProviderConfig,
    metrics, Error, ErrorKind, Result,
};
use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// JSON client bound to one provider's base URL
pub(crate) struct ProviderHttp {
    provider: &'static str,
    base_url: Url,
    timeout_ms: u64,
    client: Client,
}

impl ProviderHttp {
    pub(crate) fn new(provider: &'static str, config: &ProviderConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(Error::Config(format!("{}: api_url is empty", provider)));
        }

        let base_url = Url::parse(config.api_url.trim())
            .map_err(|e| Error::Config(format!("{}: invalid api_url: {}", provider, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "{}: api_url cannot carry a path",
                provider
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("{}: {}", provider, e)))?;

        Ok(Self {
            provider,
            base_url,
            timeout_ms: config.request_timeout_ms,
            client,
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        segments: &[&str],
    ) -> Result<T> {
        let request = self.client.get(self.url(segments)?);
        self.execute(operation, request, None).await
    }

    pub(crate) async fn post<B, T>(
        &self,
        operation: &str,
        segments: &[&str],
        body: &B,
        refusals: Option<&RefusalMessages>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(segments)?).json(body);
        self.execute(operation, request, refusals).await
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    ///
    /// Dot segments would be dropped by URL normalization and address another
    /// resource, so no payment can be named by them.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(segment) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(Error::NotFound {
                provider: self.provider.to_string(),
                message: format!("invalid path segment {:?}", segment),
            });
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{}: api_url cannot carry a path", self.provider)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
        refusals: Option<&RefusalMessages>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = self.send(request, refusals).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => match e.kind() {
                ErrorKind::NotFound => "not_found",
                ErrorKind::Refusal => "refused",
                _ => "failure",
            },
        };
        metrics::observe_provider_call(
            self.provider,
            operation,
            outcome,
            start.elapsed().as_secs_f64(),
        );
        debug!(provider = self.provider, operation, outcome, "Provider call finished");

        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        refusals: Option<&RefusalMessages>,
    ) -> Result<T> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
            return serde_json::from_slice(&bytes).map_err(|e| Error::InvalidResponse {
                provider: self.provider.to_string(),
                message: e.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let body = serde_json::from_str::<ProviderErrorBody>(&text).ok();
        let message = body
            .as_ref()
            .map(|b| b.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or(text);

        warn!(
            provider = self.provider,
            status = status.as_u16(),
            %message,
            "Provider returned error response"
        );

        let class = classifier::classify(status.as_u16(), body.as_ref(), refusals);
        Err(class.into_error(self.provider, status.as_u16(), message))
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                provider: self.provider.to_string(),
                millis: self.timeout_ms,
            }
        } else {
            Error::Connection {
                provider: self.provider.to_string(),
                message: e.to_string(),
            }
        }
    }
}
