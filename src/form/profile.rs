//! Per-deployment shape of a form: which prediction it feeds, which manual
//! fields it collects and which location event starts a weather lookup.

use clap::ValueEnum;

use crate::constants::{PREDICT_YIELD_PATH, RECOMMEND_CROP_PATH};

/// Which location event starts a weather lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerPolicy {
    /// Look up once the location field loses focus.
    #[value(name = "blur")]
    OnBlur,
    /// Look up on every edit of the location field.
    #[value(name = "change")]
    OnChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const CROP_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "ph",
    kind: FieldKind::Numeric,
}];

const YIELD_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "crop_type",
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "land_size",
        kind: FieldKind::Numeric,
    },
];

/// The second request a form issues once the gate opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PredictionVariant {
    #[value(name = "crop")]
    CropRecommendation,
    #[value(name = "yield")]
    YieldPrediction,
}

impl PredictionVariant {
    pub fn path(self) -> &'static str {
        match self {
            Self::CropRecommendation => RECOMMEND_CROP_PATH,
            Self::YieldPrediction => PREDICT_YIELD_PATH,
        }
    }

    /// Manual fields, all required
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::CropRecommendation => CROP_FIELDS,
            Self::YieldPrediction => YIELD_FIELDS,
        }
    }

    /// Whether the request body carries the location as `state`
    pub fn sends_location(self) -> bool {
        matches!(self, Self::YieldPrediction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormProfile {
    pub variant: PredictionVariant,
    pub trigger: TriggerPolicy,
}

impl FormProfile {
    pub fn new(variant: PredictionVariant, trigger: TriggerPolicy) -> Self {
        Self { variant, trigger }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.variant.fields().iter().find(|spec| spec.name == name)
    }
}

impl Default for FormProfile {
    fn default() -> Self {
        Self::new(PredictionVariant::CropRecommendation, TriggerPolicy::OnBlur)
    }
}
