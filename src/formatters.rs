use serde_json::Value;

use crate::form::machine::{FormView, SubmitAck};
use crate::form::prediction::RequestState;
use crate::form::profile::PredictionVariant;
use crate::form::weather::QueryState;
use crate::models::{CropRecommendation, YieldPrediction};

/// Formats the whole form into a human-readable string
pub fn format_form(view: &FormView) -> String {
    let mut output = format!(
        "Location: {}\n",
        if view.location.trim().is_empty() {
            "(not set)"
        } else {
            view.location.as_str()
        }
    );

    output.push_str(&format_weather(view));

    for (name, value) in &view.manual {
        output.push_str(&format!(
            "{}: {}\n",
            name,
            value.as_deref().unwrap_or("(empty)")
        ));
    }

    match &view.gate {
        Ok(()) => output.push_str("Ready to submit\n"),
        Err(block) => output.push_str(&format!("Not ready: {}\n", block)),
    }

    if let Some(request) = &view.prediction {
        output.push('\n');
        match &request.state {
            RequestState::Submitting => output.push_str("Prediction: in progress...\n"),
            RequestState::Success(value) => {
                output.push_str(&format_prediction(request.variant, value))
            }
            RequestState::Error { error, retryable } => {
                output.push_str(&format!("Prediction failed: {}\n", error));
                if *retryable {
                    output.push_str("Fields were kept; submit again to retry.\n");
                }
            }
        }
    }
    output
}

fn format_weather(view: &FormView) -> String {
    match (&view.weather.state, view.derived) {
        (_, Some(reading)) => format!(
            "Temperature: {:.2}\u{00b0}C\nHumidity: {:.2}%\nRainfall: {:.2} mm\n",
            reading.temperature, reading.humidity, reading.rainfall
        ),
        (QueryState::Loading, None) => "Weather: fetching...\n".to_string(),
        (QueryState::Error(err), None) => {
            format!("Weather: lookup failed ({}), retry to try again\n", err)
        }
        _ => "Weather: not fetched\n".to_string(),
    }
}

/// Formats a prediction reply; unknown shapes fall back to raw JSON
pub fn format_prediction(variant: PredictionVariant, value: &Value) -> String {
    match variant {
        PredictionVariant::CropRecommendation => {
            match serde_json::from_value::<CropRecommendation>(value.clone()) {
                Ok(crop) => format_crop(&crop),
                Err(_) => format!("Prediction:\n{}\n", value),
            }
        }
        PredictionVariant::YieldPrediction => {
            match serde_json::from_value::<YieldPrediction>(value.clone()) {
                Ok(prediction) => format!("Predicted yield: {}\n", prediction.predicted_yield),
                Err(_) => format!("Prediction:\n{}\n", value),
            }
        }
    }
}

fn format_crop(crop: &CropRecommendation) -> String {
    let suitability = crop.suitability.unwrap_or(70.0);
    let mut output = format!(
        "Recommended crop: {} {}\n  Season: {}\n  Match: {}% ({})\n  Expected Yield: {}\n  Profit Potential: {}\n",
        crop.icon.as_deref().unwrap_or("\u{1f33f}"),
        crop.name,
        crop.season.as_deref().unwrap_or("N/A"),
        suitability,
        suitability_band(suitability),
        crop.expected_yield.as_deref().unwrap_or("N/A"),
        crop.profit.as_deref().unwrap_or("N/A"),
    );
    if !crop.tips.is_empty() {
        output.push_str("  Key Tips:\n");
        for tip in &crop.tips {
            output.push_str(&format!("    - {}\n", tip));
        }
    }
    output
}

fn suitability_band(score: f64) -> &'static str {
    if score >= 90.0 {
        "excellent"
    } else if score >= 75.0 {
        "good"
    } else {
        "fair"
    }
}

/// One-line summary of a submit attempt
pub fn format_submit_ack(ack: &SubmitAck) -> String {
    match ack {
        SubmitAck::Started(id) => format!("Submitted prediction request {}.", id),
        SubmitAck::AlreadyInFlight(id) => {
            format!("Prediction request {} is still in flight; not resubmitted.", id)
        }
        SubmitAck::Blocked(block) => format!("Cannot submit: {}.", block),
    }
}
