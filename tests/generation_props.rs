//! Property tests: arbitrary interleavings of edits and out-of-order
//! weather replies against the bare state machine.

use proptest::prelude::*;

use agri_form::error::RemoteError;
use agri_form::form::{
    Command, Form, FormEvent, FormProfile, Generation, PredictionVariant, QueryStatus,
    SubmissionGate, TriggerPolicy,
};
use agri_form::form::weather::FetchWeather;
use agri_form::models::WeatherReading;

const LOCATIONS: &[&str] = &["Kerala", "Assam", "Tamil Nadu", "Punjab", ""];

/// A distinct reading per generation, so a late reply for a location that
/// was left and re-entered cannot pass for the current one.
fn reading_for(generation: Generation) -> WeatherReading {
    let seed = generation as f64;
    WeatherReading {
        temperature: 20.0 + seed,
        humidity: 50.0 + seed,
        rainfall: 100.0 + seed,
    }
}

#[derive(Debug, Clone)]
enum Op {
    Edit(usize),
    Commit,
    Retry,
    Reply { pick: usize, fail: bool },
    Ph(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..LOCATIONS.len()).prop_map(Op::Edit),
        Just(Op::Commit),
        Just(Op::Retry),
        (any::<usize>(), prop::bool::weighted(0.2)).prop_map(|(pick, fail)| Op::Reply { pick, fail }),
        any::<bool>().prop_map(Op::Ph),
    ]
}

fn trigger() -> impl Strategy<Value = TriggerPolicy> {
    prop_oneof![Just(TriggerPolicy::OnBlur), Just(TriggerPolicy::OnChange)]
}

proptest! {
    #[test]
    fn derived_always_matches_current_location(
        trigger in trigger(),
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let mut form = Form::new(FormProfile::new(PredictionVariant::CropRecommendation, trigger));
        let mut pending: Vec<FetchWeather> = Vec::new();
        let mut last_generation = form.store().generation();

        for op in ops {
            let step = match op {
                Op::Edit(i) => form.handle(FormEvent::LocationEdited(LOCATIONS[i].to_string())),
                Op::Commit => form.handle(FormEvent::LocationCommitted),
                Op::Retry => form.handle(FormEvent::RetryWeather),
                Op::Ph(valid) => form.handle(FormEvent::ManualFieldEdited {
                    name: "ph".into(),
                    value: if valid { "6.5".into() } else { "sour".into() },
                }),
                Op::Reply { pick, fail } => {
                    if pending.is_empty() {
                        continue;
                    }
                    let fetch = pending.remove(pick % pending.len());
                    let outcome = if fail {
                        Err(RemoteError::transport("reset"))
                    } else {
                        Ok(reading_for(fetch.generation))
                    };
                    form.handle(FormEvent::WeatherCompleted {
                        attempt: fetch.attempt,
                        generation: fetch.generation,
                        outcome,
                    })
                }
            };
            if let Some(Command::FetchWeather(fetch)) = step.command {
                pending.push(fetch);
            }

            // Generation never goes backwards and moves exactly with the text.
            let generation = form.store().generation();
            prop_assert!(generation >= last_generation);
            last_generation = generation;

            // Derived weather only ever comes from a reply for the current generation.
            if let Some(derived) = form.store().derived() {
                prop_assert_eq!(derived, reading_for(generation));
            }

            // Gate soundness.
            if SubmissionGate::allowed(form.store(), form.weather(), form.prediction()) {
                prop_assert_eq!(form.weather().status(), QueryStatus::Success);
                prop_assert_eq!(form.weather().generation, generation);
                prop_assert!(form.store().derived().is_some());
                prop_assert_eq!(form.store().manual_field("ph"), Some("6.5"));
            }
        }
    }

    #[test]
    fn every_distinct_edit_gets_a_fresh_generation(
        edits in prop::collection::vec(0..LOCATIONS.len(), 1..40),
    ) {
        let mut form = Form::new(FormProfile::default());
        let mut seen = vec![form.store().generation()];
        let mut text = String::new();

        for i in edits {
            let next = LOCATIONS[i];
            form.handle(FormEvent::LocationEdited(next.to_string()));
            let generation = form.store().generation();
            if next != text {
                prop_assert!(!seen.contains(&generation));
                seen.push(generation);
            } else {
                prop_assert_eq!(Some(&generation), seen.last());
            }
            text = next.to_string();
        }
    }
}
