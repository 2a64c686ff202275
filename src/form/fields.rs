use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::FieldError;
use crate::form::profile::{FieldKind, FieldSpec};
use crate::models::WeatherReading;

/// Tags each distinct value of the location field.
pub type Generation = u64;

/// A weather triple together with the generation it was resolved for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedReading {
    pub generation: Generation,
    pub reading: WeatherReading,
}

/// A validated manual value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ManualValue {
    Number(f64),
    Text(String),
}

/// Current input of one form instance.
///
/// The location and the generation move together: every change of the
/// location bumps the generation and drops the derived triple in the same
/// call, so nobody can observe a new location next to old weather.
#[derive(Debug, Clone)]
pub struct FieldStore {
    specs: &'static [FieldSpec],
    source_location: String,
    generation: Generation,
    derived: Option<TaggedReading>,
    manual: BTreeMap<&'static str, String>,
}

impl FieldStore {
    pub fn new(specs: &'static [FieldSpec]) -> Self {
        Self {
            specs,
            source_location: String::new(),
            generation: 0,
            derived: None,
            manual: BTreeMap::new(),
        }
    }

    pub fn source_location(&self) -> &str {
        &self.source_location
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Replace the location. Returns `false` and changes nothing when the
    /// text is identical to the current value.
    pub fn set_source_location(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if value == self.source_location {
            return false;
        }
        self.source_location = value;
        self.generation += 1;
        self.derived = None;
        true
    }

    /// Update one manual field. Never touches the location, the generation
    /// or the derived triple.
    pub fn set_manual_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), FieldError> {
        let spec = self
            .specs
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| FieldError::UnknownField {
                name: name.to_string(),
            })?;
        self.manual.insert(spec.name, value.into());
        Ok(())
    }

    pub fn manual_field(&self, name: &str) -> Option<&str> {
        self.manual.get(name).map(String::as_str)
    }

    /// The derived triple, only while it belongs to the current generation.
    pub fn derived(&self) -> Option<WeatherReading> {
        self.derived
            .filter(|tagged| tagged.generation == self.generation)
            .map(|tagged| tagged.reading)
    }

    /// Store a resolved triple. Callers go through the staleness tracker,
    /// which has already checked the tag.
    pub(crate) fn put_derived(&mut self, tagged: TaggedReading) {
        debug_assert_eq!(tagged.generation, self.generation);
        self.derived = Some(tagged);
    }

    /// Check every required manual field and parse the numeric ones.
    pub fn validate_manual(&self) -> Result<BTreeMap<&'static str, ManualValue>, FieldError> {
        let mut values = BTreeMap::new();
        for spec in self.specs {
            let raw = self.manual.get(spec.name).map(|v| v.trim()).unwrap_or("");
            if raw.is_empty() {
                return Err(FieldError::Empty {
                    name: spec.name.to_string(),
                });
            }
            let value = match spec.kind {
                FieldKind::Numeric => raw
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(ManualValue::Number)
                    .ok_or_else(|| FieldError::NotNumeric {
                        name: spec.name.to_string(),
                        value: raw.to_string(),
                    })?,
                FieldKind::Text => ManualValue::Text(raw.to_string()),
            };
            values.insert(spec.name, value);
        }
        Ok(values)
    }

    /// Immutable copy of everything a prediction needs. `None` while the
    /// derived triple is absent or a manual field is invalid.
    pub fn snapshot(&self) -> Option<FieldSnapshot> {
        let reading = self.derived()?;
        let manual = self.validate_manual().ok()?;
        Some(FieldSnapshot {
            location: self.source_location.trim().to_string(),
            generation: self.generation,
            reading,
            manual,
        })
    }
}

/// Input of one prediction request, frozen at submission time.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    pub location: String,
    pub generation: Generation,
    pub reading: WeatherReading,
    pub manual: BTreeMap<&'static str, ManualValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::profile::PredictionVariant;

    fn reading() -> WeatherReading {
        WeatherReading {
            temperature: 28.5,
            humidity: 72.0,
            rainfall: 120.3,
        }
    }

    #[test]
    fn location_change_bumps_generation_and_clears_derived() {
        let mut store = FieldStore::new(PredictionVariant::CropRecommendation.fields());
        assert!(store.set_source_location("Tamil Nadu"));
        store.put_derived(TaggedReading {
            generation: store.generation(),
            reading: reading(),
        });
        assert_eq!(store.derived(), Some(reading()));

        assert!(store.set_source_location("Kerala"));
        assert_eq!(store.generation(), 2);
        assert_eq!(store.derived(), None);
    }

    #[test]
    fn identical_location_is_not_a_change() {
        let mut store = FieldStore::new(PredictionVariant::CropRecommendation.fields());
        store.set_source_location("Assam");
        assert!(!store.set_source_location("Assam"));
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn manual_edit_leaves_generation_and_derived_alone() {
        let mut store = FieldStore::new(PredictionVariant::CropRecommendation.fields());
        store.set_source_location("Tamil Nadu");
        store.put_derived(TaggedReading {
            generation: 1,
            reading: reading(),
        });
        store.set_manual_field("ph", "6.5").unwrap();
        assert_eq!(store.generation(), 1);
        assert_eq!(store.derived(), Some(reading()));
        assert_eq!(store.manual_field("ph"), Some("6.5"));
    }

    #[test]
    fn unknown_manual_field_is_rejected() {
        let mut store = FieldStore::new(PredictionVariant::CropRecommendation.fields());
        let err = store.set_manual_field("land_size", "2").unwrap_err();
        assert_eq!(
            err,
            FieldError::UnknownField {
                name: "land_size".into()
            }
        );
    }

    #[test]
    fn validation_reports_empty_and_non_numeric() {
        let mut store = FieldStore::new(PredictionVariant::YieldPrediction.fields());
        assert!(matches!(store.validate_manual(), Err(FieldError::Empty { .. })));

        store.set_manual_field("crop_type", "rice").unwrap();
        store.set_manual_field("land_size", "two").unwrap();
        assert!(matches!(
            store.validate_manual(),
            Err(FieldError::NotNumeric { .. })
        ));

        store.set_manual_field("land_size", " 2.5 ").unwrap();
        let values = store.validate_manual().unwrap();
        assert_eq!(values["land_size"], ManualValue::Number(2.5));
        assert_eq!(values["crop_type"], ManualValue::Text("rice".into()));
    }

    #[test]
    fn snapshot_needs_current_weather() {
        let mut store = FieldStore::new(PredictionVariant::CropRecommendation.fields());
        store.set_source_location("Tamil Nadu");
        store.set_manual_field("ph", "6.5").unwrap();
        assert!(store.snapshot().is_none());

        store.put_derived(TaggedReading {
            generation: 1,
            reading: reading(),
        });
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.location, "Tamil Nadu");
    }
}
