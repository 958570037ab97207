use async_trait::async_trait;
use log::debug;
use reqwest::{Client, header::ACCEPT_LANGUAGE};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::{ClientContext, Config};
use crate::error::{Error, TransportError};
use crate::resolve::Credentials;
use crate::status::{Heartbeat, LiveStatus};

const HEARTBEAT_ENDPOINT: &str = "updated_metadata";
const LIVE_STATUS_ENDPOINT: &str = "player";

/// The three remote calls a check is built from.
#[async_trait]
pub trait LiveApi: Send + Sync {
    /// Fetches the raw HTML of the stream page.
    async fn fetch_page(&self, target: &Url) -> Result<String, TransportError>;

    async fn heartbeat(&self, credentials: &Credentials) -> Result<Heartbeat, TransportError>;

    async fn live_status(&self, credentials: &Credentials) -> Result<LiveStatus, TransportError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest<'a> {
    video_id: &'a str,
    context: RequestContext<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContext<'a> {
    client: &'a ClientContext,
}

/// Builds the JSON body shared by the heartbeat and live-status endpoints.
pub fn build_request<'a>(
    credentials: &'a Credentials,
    client: &'a ClientContext,
) -> ApiRequest<'a> {
    ApiRequest {
        video_id: credentials.content_id(),
        context: RequestContext { client },
    }
}

/// [`LiveApi`] over HTTP. Every call opens its own connection.
#[derive(Debug, Clone)]
pub struct YoutubeClient {
    api_base: Url,
    client_context: ClientContext,
    timeout: Duration,
}

impl YoutubeClient {
    pub fn new(api_base: Url, client_context: ClientContext, timeout: Duration) -> Self {
        Self {
            api_base,
            client_context,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(
            config.api_base()?,
            config.client.clone(),
            Duration::from_secs(config.check.request_timeout_secs),
        ))
    }

    fn http(&self) -> Result<Client, TransportError> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .build()?)
    }

    fn endpoint(&self, name: &str, access_key: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url.query_pairs_mut().append_pair("key", access_key);
        url
    }

    async fn post(&self, name: &str, credentials: &Credentials) -> Result<Value, TransportError> {
        let body = build_request(credentials, &self.client_context);
        let text = self
            .http()?
            .post(self.endpoint(name, credentials.access_key()))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let value: Value = serde_json::from_str(&text)?;
        debug!(
            "{name} response:\n{}",
            serde_json::to_string_pretty(&value).unwrap_or(text)
        );
        Ok(value)
    }
}

#[async_trait]
impl LiveApi for YoutubeClient {
    async fn fetch_page(&self, target: &Url) -> Result<String, TransportError> {
        Ok(self
            .http()?
            .get(target.clone())
            .header(ACCEPT_LANGUAGE, self.client_context.hl.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    async fn heartbeat(&self, credentials: &Credentials) -> Result<Heartbeat, TransportError> {
        let value = self.post(HEARTBEAT_ENDPOINT, credentials).await?;
        Ok(Heartbeat::from_value(&value))
    }

    async fn live_status(&self, credentials: &Credentials) -> Result<LiveStatus, TransportError> {
        let value = self.post(LIVE_STATUS_ENDPOINT, credentials).await?;
        Ok(LiveStatus::from_value(&value))
    }
}
