//! The form as an explicit state machine.
//!
//! Every user input and every network completion is a [`FormEvent`].
//! Handling an event mutates the form synchronously and may ask for one
//! network call via [`Command`]; performing it is the driver's job.

use serde_json::Value;

use crate::error::{FieldError, ResolveError, SubmitError};
use crate::form::fields::{FieldStore, Generation};
use crate::form::gate::{GateBlock, SubmissionGate};
use crate::form::prediction::{PredictionRequest, PredictionRequester, RequestId, SendPrediction, Submission};
use crate::form::profile::FormProfile;
use crate::form::staleness::StalenessTracker;
use crate::form::weather::{AttemptId, FetchWeather, WeatherOutcome, WeatherQuery, WeatherResolver};
use crate::models::WeatherReading;

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    LocationEdited(String),
    LocationCommitted,
    ManualFieldEdited {
        name: String,
        value: String,
    },
    RetryWeather,
    SubmitRequested,
    WeatherCompleted {
        attempt: AttemptId,
        generation: Generation,
        outcome: Result<WeatherReading, ResolveError>,
    },
    PredictionCompleted {
        request_id: RequestId,
        outcome: Result<Value, SubmitError>,
    },
}

/// Network work requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchWeather(FetchWeather),
    SendPrediction(SendPrediction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitAck {
    Started(RequestId),
    AlreadyInFlight(RequestId),
    Blocked(GateBlock),
}

/// Immediate answer to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    Done,
    Field(Result<(), FieldError>),
    Submit(SubmitAck),
    Weather(WeatherOutcome),
    /// Whether a prediction reply was applied
    Prediction(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub ack: Ack,
    pub command: Option<Command>,
}

impl Step {
    fn ack(ack: Ack) -> Self {
        Self { ack, command: None }
    }
}

/// Read-only copy of the form for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub profile: FormProfile,
    pub location: String,
    pub generation: Generation,
    pub derived: Option<WeatherReading>,
    pub manual: Vec<(&'static str, Option<String>)>,
    pub weather: WeatherQuery,
    pub gate: Result<(), GateBlock>,
    pub prediction: Option<PredictionRequest>,
    /// Weather responses dropped because the location had moved on
    pub stale_responses: u64,
}

/// One form instance: fields, current weather query, current prediction.
#[derive(Debug, Clone)]
pub struct Form {
    profile: FormProfile,
    store: FieldStore,
    tracker: StalenessTracker,
    resolver: WeatherResolver,
    requester: PredictionRequester,
}

impl Form {
    pub fn new(profile: FormProfile) -> Self {
        Self {
            profile,
            store: FieldStore::new(profile.variant.fields()),
            tracker: StalenessTracker::new(),
            resolver: WeatherResolver::new(profile.trigger),
            requester: PredictionRequester::new(profile.variant),
        }
    }

    pub fn profile(&self) -> FormProfile {
        self.profile
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn weather(&self) -> &WeatherQuery {
        self.resolver.current()
    }

    pub fn prediction(&self) -> Option<&PredictionRequest> {
        self.requester.current()
    }

    pub fn stale_responses(&self) -> u64 {
        self.tracker.dropped()
    }

    pub fn gate(&self) -> Result<(), GateBlock> {
        SubmissionGate::evaluate(&self.store, self.resolver.current(), self.requester.current())
    }

    pub fn handle(&mut self, event: FormEvent) -> Step {
        match event {
            FormEvent::LocationEdited(text) => Step {
                ack: Ack::Done,
                command: self.edit_location(text).map(Command::FetchWeather),
            },
            FormEvent::LocationCommitted => Step {
                ack: Ack::Done,
                command: self.commit_location().map(Command::FetchWeather),
            },
            FormEvent::ManualFieldEdited { name, value } => {
                Step::ack(Ack::Field(self.set_field(&name, value)))
            }
            FormEvent::RetryWeather => Step {
                ack: Ack::Done,
                command: self.retry_weather().map(Command::FetchWeather),
            },
            FormEvent::SubmitRequested => {
                let (ack, send) = self.submit();
                Step {
                    ack: Ack::Submit(ack),
                    command: send.map(Command::SendPrediction),
                }
            }
            FormEvent::WeatherCompleted {
                attempt,
                generation,
                outcome,
            } => Step::ack(Ack::Weather(self.weather_completed(attempt, generation, outcome))),
            FormEvent::PredictionCompleted {
                request_id,
                outcome,
            } => Step::ack(Ack::Prediction(self.prediction_completed(request_id, outcome))),
        }
    }

    pub fn edit_location(&mut self, text: impl Into<String>) -> Option<FetchWeather> {
        let previous = self.store.generation();
        if !self.store.set_source_location(text) {
            return None;
        }
        tracing::debug!(
            "Location generation {} -> {}, derived weather invalidated",
            previous,
            self.store.generation()
        );
        self.resolver.on_location_edited(&self.store)
    }

    pub fn commit_location(&mut self) -> Option<FetchWeather> {
        self.resolver.on_location_committed(&self.store)
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), FieldError> {
        self.store.set_manual_field(name, value)
    }

    pub fn retry_weather(&mut self) -> Option<FetchWeather> {
        self.resolver.retry(&self.store)
    }

    /// Ask for a prediction. An in-flight request is returned as is; a
    /// closed gate issues nothing.
    pub fn submit(&mut self) -> (SubmitAck, Option<SendPrediction>) {
        if let Some(existing) = self.requester.in_flight() {
            return (SubmitAck::AlreadyInFlight(existing.id), None);
        }
        if let Err(block) = self.gate() {
            tracing::debug!("Submission blocked: {}", block);
            return (SubmitAck::Blocked(block), None);
        }
        let Some(snapshot) = self.store.snapshot() else {
            return (SubmitAck::Blocked(GateBlock::WeatherStale), None);
        };
        match self.requester.submit(snapshot) {
            Submission::Started(send) => (SubmitAck::Started(send.request_id), Some(send)),
            Submission::AlreadyInFlight(existing) => (SubmitAck::AlreadyInFlight(existing.id), None),
        }
    }

    pub fn weather_completed(
        &mut self,
        attempt: AttemptId,
        generation: Generation,
        outcome: Result<WeatherReading, ResolveError>,
    ) -> WeatherOutcome {
        self.resolver
            .complete(&mut self.store, &mut self.tracker, attempt, generation, outcome)
    }

    pub fn prediction_completed(
        &mut self,
        request_id: RequestId,
        outcome: Result<Value, SubmitError>,
    ) -> bool {
        self.requester.complete(request_id, outcome)
    }

    pub fn view(&self) -> FormView {
        FormView {
            profile: self.profile,
            location: self.store.source_location().to_string(),
            generation: self.store.generation(),
            derived: self.store.derived(),
            manual: self
                .profile
                .variant
                .fields()
                .iter()
                .map(|spec| (spec.name, self.store.manual_field(spec.name).map(str::to_string)))
                .collect(),
            weather: self.resolver.current().clone(),
            gate: self.gate(),
            prediction: self.requester.current().cloned(),
            stale_responses: self.tracker.dropped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::profile::{PredictionVariant, TriggerPolicy};
    use crate::form::prediction::RequestStatus;
    use crate::form::weather::QueryStatus;
    use serde_json::json;

    const TAMIL_NADU: WeatherReading = WeatherReading {
        temperature: 28.5,
        humidity: 72.0,
        rainfall: 120.3,
    };

    fn expect_fetch(step: Step) -> FetchWeather {
        match step.command {
            Some(Command::FetchWeather(fetch)) => fetch,
            other => panic!("expected a weather fetch, got {:?}", other),
        }
    }

    fn resolved_crop_form() -> Form {
        let mut form = Form::new(FormProfile::default());
        form.handle(FormEvent::LocationEdited("Tamil Nadu".into()));
        let fetch = expect_fetch(form.handle(FormEvent::LocationCommitted));
        form.handle(FormEvent::WeatherCompleted {
            attempt: fetch.attempt,
            generation: fetch.generation,
            outcome: Ok(TAMIL_NADU),
        });
        form
    }

    #[test]
    fn scenario_resolve_then_fill_then_submit() {
        let mut form = resolved_crop_form();
        assert_eq!(form.store().derived(), Some(TAMIL_NADU));
        assert!(form.gate().is_err());

        let step = form.handle(FormEvent::ManualFieldEdited {
            name: "ph".into(),
            value: "6.5".into(),
        });
        assert_eq!(step.ack, Ack::Field(Ok(())));
        assert!(form.gate().is_ok());

        let step = form.handle(FormEvent::SubmitRequested);
        let Some(Command::SendPrediction(send)) = step.command else {
            panic!("expected a prediction request");
        };
        assert_eq!(send.payload["ph"], 6.5);

        form.handle(FormEvent::PredictionCompleted {
            request_id: send.request_id,
            outcome: Ok(json!({"name": "Rice", "suitability": 92})),
        });
        assert_eq!(form.prediction().unwrap().status(), RequestStatus::Success);
    }

    #[test]
    fn submit_twice_issues_one_request() {
        let mut form = resolved_crop_form();
        form.set_field("ph", "6.5").unwrap();

        let (first, send) = form.submit();
        assert!(send.is_some());
        let (second, again) = form.submit();
        assert!(again.is_none());
        let SubmitAck::Started(id) = first else {
            panic!("expected start");
        };
        assert_eq!(second, SubmitAck::AlreadyInFlight(id));
    }

    #[test]
    fn edit_after_submit_does_not_touch_payload() {
        let mut form = resolved_crop_form();
        form.set_field("ph", "6.5").unwrap();
        let (_, send) = form.submit();
        let send = send.unwrap();

        form.set_field("ph", "8.0").unwrap();
        form.edit_location("Kerala");

        let request = form.prediction().unwrap();
        assert_eq!(request.payload, send.payload);
        assert_eq!(request.payload["ph"], 6.5);
        assert_eq!(request.snapshot.location, "Tamil Nadu");
    }

    #[test]
    fn failed_submission_keeps_fields_for_retry() {
        let mut form = resolved_crop_form();
        form.set_field("ph", "6.5").unwrap();
        let (_, send) = form.submit();
        let send = send.unwrap();
        form.prediction_completed(send.request_id, Err(SubmitError::transport("connection refused")));

        assert_eq!(form.store().manual_field("ph"), Some("6.5"));
        assert!(form.gate().is_ok());
        let (_, retry) = form.submit();
        assert_eq!(retry.unwrap().payload, send.payload);
    }

    #[test]
    fn location_change_after_success_requires_new_lookup() {
        let mut form = resolved_crop_form();
        form.set_field("ph", "6.5").unwrap();
        assert!(form.edit_location("Kerala").is_none());

        assert_eq!(form.weather().status(), QueryStatus::Idle);
        assert!(matches!(form.submit().0, SubmitAck::Blocked(_)));
    }

    #[test]
    fn yield_form_fetches_on_change() {
        let mut form = Form::new(FormProfile::new(
            PredictionVariant::YieldPrediction,
            TriggerPolicy::OnChange,
        ));
        let fetch = expect_fetch(form.handle(FormEvent::LocationEdited("Punjab".into())));
        assert_eq!(fetch.location, "Punjab");
        assert!(form.handle(FormEvent::LocationCommitted).command.is_none());
    }

    #[test]
    fn unknown_field_is_a_validation_error() {
        let mut form = Form::new(FormProfile::default());
        let step = form.handle(FormEvent::ManualFieldEdited {
            name: "colour".into(),
            value: "green".into(),
        });
        assert!(matches!(step.ack, Ack::Field(Err(FieldError::UnknownField { .. }))));
    }
}
