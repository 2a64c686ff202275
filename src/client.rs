use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::constants::{USER_AGENT, WEATHER_PATH};
use crate::error::{RemoteError, ResolveError, SubmitError};
use crate::form::prediction::PredictionService;
use crate::form::profile::PredictionVariant;
use crate::form::weather::WeatherSource;
use crate::models::{ServiceErrorBody, WeatherReading};

/// HTTP client for the weather and prediction endpoints of one service
#[derive(Clone)]
pub struct ServiceClient {
    client: Arc<Client>,
    base_url: String,
}

impl ServiceClient {
    /// Creates a client for the service rooted at `base_url`.
    ///
    /// No request deadline is set on the client. `FetchWeather::run` and
    /// `SendPrediction::run` bound every call and report `RemoteError::Timeout`.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reads the body and decodes it according to the status
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, &body)
    }
}

/// Turns a status and raw body into `T`, or the matching error.
///
/// Non-success statuses prefer the service's `{"error": ...}` message and
/// fall back to the canonical reason phrase.
pub fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, RemoteError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ServiceErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown status").to_string());
        return Err(RemoteError::status(status.as_u16(), message));
    }

    serde_json::from_str(body).map_err(|e| RemoteError::malformed(e.to_string()))
}

#[async_trait]
impl WeatherSource for ServiceClient {
    async fn lookup(&self, location: &str) -> Result<WeatherReading, ResolveError> {
        let response = self
            .client
            .get(self.url(WEATHER_PATH))
            .query(&[("state", location)])
            .send()
            .await?;

        Self::read_json(response).await
    }
}

#[async_trait]
impl PredictionService for ServiceClient {
    async fn predict(&self, variant: PredictionVariant, body: &Value) -> Result<Value, SubmitError> {
        let response = self
            .client
            .post(self.url(variant.path()))
            .json(body)
            .send()
            .await?;

        Self::read_json(response).await
    }
}
