//! Keeps derived weather from outliving the location it was resolved for.

use crate::form::fields::{FieldStore, Generation, TaggedReading};
use crate::models::WeatherReading;

/// What happened to a weather response on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Applied,
    /// Tagged with an older generation; dropped without touching the store.
    Stale { response: Generation, current: Generation },
}

/// Gatekeeper between weather responses and the field store.
///
/// The generation counter on the store is the only invalidation signal: a
/// location edit bumps it, and from then on anything tagged lower is
/// refused here.
#[derive(Debug, Default, Clone)]
pub struct StalenessTracker {
    dropped: u64,
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_current(&self, store: &FieldStore, generation: Generation) -> bool {
        generation == store.generation()
    }

    /// Decide whether a response tagged `generation` may still touch the
    /// store. Stale responses are counted.
    pub fn check(&mut self, store: &FieldStore, generation: Generation) -> Admission {
        if self.is_current(store, generation) {
            return Admission::Applied;
        }
        self.dropped += 1;
        tracing::debug!(
            "Dropping weather response for generation {} (current {})",
            generation,
            store.generation()
        );
        Admission::Stale {
            response: generation,
            current: store.generation(),
        }
    }

    /// Apply `reading` to the store only if `generation` is still current.
    pub fn admit(
        &mut self,
        store: &mut FieldStore,
        generation: Generation,
        reading: WeatherReading,
    ) -> Admission {
        let admission = self.check(store, generation);
        if admission == Admission::Applied {
            store.put_derived(TaggedReading {
                generation,
                reading,
            });
        }
        admission
    }

    /// Number of responses refused so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
