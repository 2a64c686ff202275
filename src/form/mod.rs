//! Dependent-field pipeline: location -> weather -> gated prediction.

pub mod fields;
pub mod gate;
pub mod machine;
pub mod prediction;
pub mod profile;
pub mod staleness;
pub mod weather;

pub use fields::{FieldSnapshot, FieldStore, Generation, ManualValue};
pub use gate::{GateBlock, SubmissionGate};
pub use machine::{Ack, Command, Form, FormEvent, FormView, Step, SubmitAck};
pub use prediction::{PredictionRequest, PredictionService, RequestStatus};
pub use profile::{FormProfile, PredictionVariant, TriggerPolicy};
pub use staleness::StalenessTracker;
pub use weather::{QueryStatus, WeatherQuery, WeatherResolver, WeatherSource};
