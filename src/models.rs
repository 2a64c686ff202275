use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Remote Service Models
// ============================================================================

/// Weather triple returned by `GET /weather?state=...`.
///
/// Temperature in °C, humidity in %, rainfall in mm. All three fields are
/// required; a body missing any of them is a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct WeatherReading {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

/// Error body the remote service sends alongside 4xx/5xx statuses
#[derive(Debug, Deserialize)]
pub struct ServiceErrorBody {
    pub error: String,
}

/// Display view of a `/recommend-crop` response.
///
/// The pipeline hands the raw JSON through untouched; this view only exists
/// for rendering, so every field tolerates absence.
#[derive(Debug, Clone, Deserialize)]
pub struct CropRecommendation {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(rename = "yield", default)]
    pub expected_yield: Option<String>,
    #[serde(default)]
    pub profit: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub suitability: Option<f64>,
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Display view of a `/api/predict-yield` response
#[derive(Debug, Clone, Deserialize)]
pub struct YieldPrediction {
    pub predicted_yield: f64,
}

// ============================================================================
// MCP Tool Request Models
// ============================================================================

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetLocationRequest {
    /// Free-text location, e.g. "Tamil Nadu"
    pub location: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetFieldRequest {
    /// Manual field name, e.g. "ph", "crop_type" or "land_size"
    pub name: String,
    pub value: String,
}
