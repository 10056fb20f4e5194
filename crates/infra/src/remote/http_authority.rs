//! HTTP implementation of the remote authority port.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use serde::Serialize;
use shuttlelink_core::RemoteAuthority;
use shuttlelink_domain::{RemoteConfig, Result, ShuttleError, SyncableRecord};
use tracing::{debug, instrument, warn};

use super::errors::RemoteError;
use crate::http::HttpClient;

/// Pushes records with `PUT {base_url}/sync/{kind}/{id}`.
pub struct HttpRemoteAuthority {
    client: HttpClient,
    base_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushBody<'a> {
    id: &'a str,
    kind: &'static str,
    payload: &'a serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl HttpRemoteAuthority {
    pub fn new(client: HttpClient, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ShuttleError::Config(format!("invalid remote base URL {base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ShuttleError::Config(format!("remote base URL {base_url} cannot be a base")));
        }
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .user_agent(concat!("shuttlelink/", env!("CARGO_PKG_VERSION")))
            .bearer_token(config.api_token.clone())
            .build()?;
        Self::new(client, &config.base_url)
    }

    /// Resolve the endpoint for `record`, percent-encoding the id.
    pub fn record_url(&self, record: &SyncableRecord) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ShuttleError::Config("remote base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["sync", record.kind.as_str(), record.id.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl RemoteAuthority for HttpRemoteAuthority {
    #[instrument(skip(self, record), fields(kind = %record.kind, id = %record.id))]
    async fn push(&self, record: &SyncableRecord) -> Result<()> {
        let url = self.record_url(record)?;
        let body = PushBody {
            id: &record.id,
            kind: record.kind.as_str(),
            payload: &record.payload,
            updated_at: record.updated_at,
        };

        let response = self.client.send(self.client.request(Method::PUT, url).json(&body)).await?;
        let status = response.status();
        if status.is_success() {
            debug!(%status, "record accepted by remote");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let err = RemoteError::from_response(status, &text);
        warn!(%status, retryable = err.should_retry(), "remote did not accept record");
        Err(err.into())
    }
}
