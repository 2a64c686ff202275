//! Whether the prediction request may be issued right now.

use std::fmt;

use crate::error::FieldError;
use crate::form::fields::FieldStore;
use crate::form::prediction::{PredictionRequest, RequestStatus};
use crate::form::weather::{QueryStatus, WeatherQuery};

/// First reason the gate is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum GateBlock {
    /// No successful lookup yet (idle, loading or failed).
    WeatherUnresolved(QueryStatus),
    /// The successful lookup belongs to an older location.
    WeatherStale,
    InvalidField(FieldError),
    SubmissionInFlight,
}

impl fmt::Display for GateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeatherUnresolved(QueryStatus::Loading) => write!(f, "weather lookup in progress"),
            Self::WeatherUnresolved(QueryStatus::Error) => write!(f, "weather lookup failed"),
            Self::WeatherUnresolved(_) => write!(f, "weather not fetched yet"),
            Self::WeatherStale => write!(f, "weather belongs to a previous location"),
            Self::InvalidField(err) => write!(f, "{}", err),
            Self::SubmissionInFlight => write!(f, "a prediction is already being requested"),
        }
    }
}

/// Pure predicate over the form's current state. Recomputed on demand,
/// never cached.
pub struct SubmissionGate;

impl SubmissionGate {
    pub fn evaluate(
        store: &FieldStore,
        weather: &WeatherQuery,
        prediction: Option<&PredictionRequest>,
    ) -> Result<(), GateBlock> {
        if weather.status() != QueryStatus::Success {
            return Err(GateBlock::WeatherUnresolved(weather.status()));
        }
        if weather.generation != store.generation() || store.derived().is_none() {
            return Err(GateBlock::WeatherStale);
        }
        store.validate_manual().map_err(GateBlock::InvalidField)?;
        if prediction.is_some_and(|request| request.status() == RequestStatus::Submitting) {
            return Err(GateBlock::SubmissionInFlight);
        }
        Ok(())
    }

    pub fn allowed(
        store: &FieldStore,
        weather: &WeatherQuery,
        prediction: Option<&PredictionRequest>,
    ) -> bool {
        Self::evaluate(store, weather, prediction).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::profile::{PredictionVariant, TriggerPolicy};
    use crate::form::staleness::StalenessTracker;
    use crate::form::weather::WeatherResolver;
    use crate::models::WeatherReading;

    const READING: WeatherReading = WeatherReading {
        temperature: 28.5,
        humidity: 72.0,
        rainfall: 120.3,
    };

    fn resolved(location: &str) -> (FieldStore, WeatherResolver) {
        let mut store = FieldStore::new(PredictionVariant::CropRecommendation.fields());
        let mut tracker = StalenessTracker::new();
        let mut resolver = WeatherResolver::new(TriggerPolicy::OnBlur);
        store.set_source_location(location);
        let fetch = resolver.on_location_committed(&store).unwrap();
        resolver.complete(&mut store, &mut tracker, fetch.attempt, fetch.generation, Ok(READING));
        (store, resolver)
    }

    #[test]
    fn opens_once_weather_and_fields_are_ready() {
        let (mut store, resolver) = resolved("Tamil Nadu");
        assert!(matches!(
            SubmissionGate::evaluate(&store, resolver.current(), None),
            Err(GateBlock::InvalidField(FieldError::Empty { .. }))
        ));

        store.set_manual_field("ph", "6.5").unwrap();
        assert!(SubmissionGate::allowed(&store, resolver.current(), None));
    }

    #[test]
    fn closes_when_location_moves_on() {
        let (mut store, resolver) = resolved("Tamil Nadu");
        store.set_manual_field("ph", "6.5").unwrap();
        store.set_source_location("Kerala");
        assert_eq!(
            SubmissionGate::evaluate(&store, resolver.current(), None),
            Err(GateBlock::WeatherStale)
        );
    }

    #[test]
    fn closed_before_any_lookup() {
        let store = FieldStore::new(PredictionVariant::CropRecommendation.fields());
        let resolver = WeatherResolver::new(TriggerPolicy::OnBlur);
        assert_eq!(
            SubmissionGate::evaluate(&store, resolver.current(), None),
            Err(GateBlock::WeatherUnresolved(QueryStatus::Idle))
        );
    }

    #[test]
    fn non_numeric_ph_keeps_gate_closed() {
        let (mut store, resolver) = resolved("Tamil Nadu");
        store.set_manual_field("ph", "acidic").unwrap();
        assert!(!SubmissionGate::allowed(&store, resolver.current(), None));
    }
}
