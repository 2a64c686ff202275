//! Location -> weather lookup, guarded against out-of-order responses.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::form::fields::{FieldStore, Generation};
use crate::form::profile::TriggerPolicy;
use crate::form::staleness::{Admission, StalenessTracker};
use crate::models::WeatherReading;

/// Identifies one weather attempt; a new attempt supersedes every older one.
pub type AttemptId = u64;

/// Remote weather lookup.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn lookup(&self, location: &str) -> Result<WeatherReading, ResolveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    Idle,
    Loading,
    Success(WeatherReading),
    Error(ResolveError),
}

/// One weather attempt. Replaced, never mutated, when a new attempt starts.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub attempt: AttemptId,
    pub generation: Generation,
    pub state: QueryState,
}

impl WeatherQuery {
    fn idle(attempt: AttemptId, generation: Generation) -> Self {
        Self {
            attempt,
            generation,
            state: QueryState::Idle,
        }
    }

    pub fn status(&self) -> QueryStatus {
        match self.state {
            QueryState::Idle => QueryStatus::Idle,
            QueryState::Loading => QueryStatus::Loading,
            QueryState::Success(_) => QueryStatus::Success,
            QueryState::Error(_) => QueryStatus::Error,
        }
    }

    pub fn result(&self) -> Option<WeatherReading> {
        match self.state {
            QueryState::Success(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ResolveError> {
        match &self.state {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Outbound lookup the driver has to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWeather {
    pub attempt: AttemptId,
    pub generation: Generation,
    pub location: String,
}

impl FetchWeather {
    /// Perform the lookup, bounded by `timeout`.
    pub async fn run(
        &self,
        source: &dyn WeatherSource,
        timeout: Duration,
    ) -> Result<WeatherReading, ResolveError> {
        tracing::info!(
            "Looking up weather for '{}' (generation {})",
            self.location,
            self.generation
        );
        match tokio::time::timeout(timeout, source.lookup(&self.location)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ResolveError::Timeout(timeout)),
        }
    }
}

/// What a completed lookup did to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherOutcome {
    Applied,
    Failed,
    /// The location changed since the lookup started.
    Stale,
    /// A newer attempt for the same location is outstanding.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct WeatherResolver {
    policy: TriggerPolicy,
    next_attempt: AttemptId,
    current: WeatherQuery,
}

impl WeatherResolver {
    pub fn new(policy: TriggerPolicy) -> Self {
        Self {
            policy,
            next_attempt: 1,
            current: WeatherQuery::idle(0, 0),
        }
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn current(&self) -> &WeatherQuery {
        &self.current
    }

    /// Location text changed.
    pub fn on_location_edited(&mut self, store: &FieldStore) -> Option<FetchWeather> {
        match self.policy {
            TriggerPolicy::OnChange => self.resolve(store.source_location(), store.generation()),
            TriggerPolicy::OnBlur => {
                self.current = WeatherQuery::idle(self.current.attempt, store.generation());
                None
            }
        }
    }

    /// Location field lost focus.
    pub fn on_location_committed(&mut self, store: &FieldStore) -> Option<FetchWeather> {
        match self.policy {
            TriggerPolicy::OnBlur if !self.settled_or_loading(store.generation()) => {
                self.resolve(store.source_location(), store.generation())
            }
            _ => None,
        }
    }

    /// Explicit retry after a failed lookup.
    pub fn retry(&mut self, store: &FieldStore) -> Option<FetchWeather> {
        if self.settled_or_loading(store.generation()) {
            return None;
        }
        self.resolve(store.source_location(), store.generation())
    }

    fn settled_or_loading(&self, generation: Generation) -> bool {
        self.current.generation == generation
            && matches!(
                self.current.status(),
                QueryStatus::Loading | QueryStatus::Success
            )
    }

    /// Start a new attempt for `location`, replacing the current query.
    /// A blank location resets to idle without any request.
    pub fn resolve(&mut self, location: &str, generation: Generation) -> Option<FetchWeather> {
        let location = location.trim();
        if location.is_empty() {
            self.current = WeatherQuery::idle(self.current.attempt, generation);
            return None;
        }

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.current = WeatherQuery {
            attempt,
            generation,
            state: QueryState::Loading,
        };
        Some(FetchWeather {
            attempt,
            generation,
            location: location.to_string(),
        })
    }

    /// Fold a finished lookup into the form.
    pub fn complete(
        &mut self,
        store: &mut FieldStore,
        tracker: &mut StalenessTracker,
        attempt: AttemptId,
        generation: Generation,
        outcome: Result<WeatherReading, ResolveError>,
    ) -> WeatherOutcome {
        if let Admission::Stale { .. } = tracker.check(store, generation) {
            return WeatherOutcome::Stale;
        }
        if attempt != self.current.attempt {
            tracing::debug!(
                "Ignoring weather attempt {} superseded by {}",
                attempt,
                self.current.attempt
            );
            return WeatherOutcome::Superseded;
        }

        match outcome {
            Ok(reading) => {
                tracker.admit(store, generation, reading);
                tracing::info!(
                    "Weather resolved for generation {}: {:.2}\u{00b0}C, {:.2}%, {:.2} mm",
                    generation,
                    reading.temperature,
                    reading.humidity,
                    reading.rainfall
                );
                self.current = WeatherQuery {
                    attempt,
                    generation,
                    state: QueryState::Success(reading),
                };
                WeatherOutcome::Applied
            }
            Err(err) => {
                tracing::warn!("Weather lookup failed for generation {}: {}", generation, err);
                self.current = WeatherQuery {
                    attempt,
                    generation,
                    state: QueryState::Error(err),
                };
                WeatherOutcome::Failed
            }
        }
    }
}
