//! Delivery of event batches.

use super::{InsightsError, event::EventBatch};
use futures::future::BoxFuture;
use reqwest::Url;
use std::time::Duration;

/// Where flushed batches go.
pub trait EventSink: Send + Sync {
    fn send<'a>(&'a self, batch: &'a EventBatch) -> BoxFuture<'a, Result<(), InsightsError>>;
}

/// `{api_host}/v1/orgs/{org}/sites/{site}/insights/events`
///
/// Any path on `api_host` is replaced.
pub fn events_endpoint(api_host: &str, organization_id: &str, site_id: &str) -> Result<Url, InsightsError> {
    let mut url = Url::parse(api_host).map_err(|_| InsightsError::InvalidHost(api_host.to_owned()))?;
    if url.cannot_be_a_base() {
        return Err(InsightsError::InvalidHost(api_host.to_owned()));
    }
    url.set_path(&format!(
        "/v1/orgs/{organization_id}/sites/{site_id}/insights/events"
    ));
    Ok(url)
}

/// POSTs batches as JSON to the collection API.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSink {
    pub fn new(endpoint: Url, timeout: Duration, user_agent: &str) -> Result<Self, InsightsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(InsightsError::Delivery)?;
        Ok(Self { client, endpoint })
    }
}

impl EventSink for HttpSink {
    fn send<'a>(&'a self, batch: &'a EventBatch) -> BoxFuture<'a, Result<(), InsightsError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(batch)
                .send()
                .await
                .map_err(InsightsError::Delivery)?;

            let status = response.status();
            if !status.is_success() {
                return Err(InsightsError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}
