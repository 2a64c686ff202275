//! The second request: crop recommendation or yield prediction.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::SubmitError;
use crate::form::fields::FieldSnapshot;
use crate::form::profile::PredictionVariant;

pub type RequestId = u64;

/// Remote prediction endpoint.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// POST `body` to the variant's endpoint and return the parsed JSON reply
    async fn predict(&self, variant: PredictionVariant, body: &Value) -> Result<Value, SubmitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Idle,
    Submitting,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    Submitting,
    /// Reply body, passed through without shape checks
    Success(Value),
    Error { error: SubmitError, retryable: bool },
}

/// One submission attempt. Its payload is fixed when it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub id: RequestId,
    pub variant: PredictionVariant,
    pub snapshot: FieldSnapshot,
    pub payload: Value,
    pub state: RequestState,
}

impl PredictionRequest {
    pub fn status(&self) -> RequestStatus {
        match self.state {
            RequestState::Submitting => RequestStatus::Submitting,
            RequestState::Success(_) => RequestStatus::Success,
            RequestState::Error { .. } => RequestStatus::Error,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            RequestState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SubmitError> {
        match &self.state {
            RequestState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.state, RequestState::Error { retryable: true, .. })
    }
}

/// Build the JSON body for `variant` from a frozen snapshot.
pub fn build_payload(variant: PredictionVariant, snapshot: &FieldSnapshot) -> Value {
    let mut body = Map::new();
    if variant.sends_location() {
        body.insert("state".into(), Value::from(snapshot.location.clone()));
    }
    body.insert("temperature".into(), Value::from(snapshot.reading.temperature));
    body.insert("humidity".into(), Value::from(snapshot.reading.humidity));
    body.insert("rainfall".into(), Value::from(snapshot.reading.rainfall));
    for (name, value) in &snapshot.manual {
        // ManualValue serializes untagged, so this cannot fail
        if let Ok(value) = serde_json::to_value(value) {
            body.insert((*name).to_string(), value);
        }
    }
    Value::Object(body)
}

/// Outbound prediction the driver has to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct SendPrediction {
    pub request_id: RequestId,
    pub variant: PredictionVariant,
    pub payload: Value,
}

impl SendPrediction {
    /// Perform the request, bounded by `timeout`.
    pub async fn run(
        &self,
        service: &dyn PredictionService,
        timeout: Duration,
    ) -> Result<Value, SubmitError> {
        tracing::info!(
            "Submitting prediction request {} to {}",
            self.request_id,
            self.variant.path()
        );
        match tokio::time::timeout(timeout, service.predict(self.variant, &self.payload)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SubmitError::Timeout(timeout)),
        }
    }
}

/// Result of asking for a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Started(SendPrediction),
    /// A request is already in flight; nothing new was issued.
    AlreadyInFlight(PredictionRequest),
}

/// Owns the form's current prediction attempt.
#[derive(Debug, Clone)]
pub struct PredictionRequester {
    variant: PredictionVariant,
    next_id: RequestId,
    current: Option<PredictionRequest>,
}

impl PredictionRequester {
    pub fn new(variant: PredictionVariant) -> Self {
        Self {
            variant,
            next_id: 1,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&PredictionRequest> {
        self.current.as_ref()
    }

    pub fn status(&self) -> RequestStatus {
        self.current
            .as_ref()
            .map_or(RequestStatus::Idle, PredictionRequest::status)
    }

    pub fn in_flight(&self) -> Option<&PredictionRequest> {
        self.current
            .as_ref()
            .filter(|request| request.status() == RequestStatus::Submitting)
    }

    /// Start a new request from `snapshot`, unless one is already in flight.
    pub fn submit(&mut self, snapshot: FieldSnapshot) -> Submission {
        if let Some(existing) = self.in_flight() {
            tracing::debug!("Prediction request {} already in flight", existing.id);
            return Submission::AlreadyInFlight(existing.clone());
        }

        let id = self.next_id;
        self.next_id += 1;
        let payload = build_payload(self.variant, &snapshot);
        self.current = Some(PredictionRequest {
            id,
            variant: self.variant,
            snapshot,
            payload: payload.clone(),
            state: RequestState::Submitting,
        });
        Submission::Started(SendPrediction {
            request_id: id,
            variant: self.variant,
            payload,
        })
    }

    /// Fold a finished request in. Returns `false` for a reply that does
    /// not belong to the current request.
    pub fn complete(&mut self, request_id: RequestId, outcome: Result<Value, SubmitError>) -> bool {
        let Some(current) = self.current.as_mut().filter(|r| r.id == request_id) else {
            tracing::debug!("Ignoring reply for unknown prediction request {}", request_id);
            return false;
        };

        current.state = match outcome {
            Ok(value) => {
                tracing::info!("Prediction request {} succeeded", request_id);
                RequestState::Success(value)
            }
            Err(error) => {
                tracing::warn!("Prediction request {} failed: {}", request_id, error);
                RequestState::Error {
                    error,
                    retryable: true,
                }
            }
        };
        true
    }
}
