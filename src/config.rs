use std::time::Duration;

use clap::Parser;

use crate::constants::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use crate::form::profile::{FormProfile, PredictionVariant, TriggerPolicy};

/// Command-line arguments, each with an environment fallback
#[derive(Parser, Debug, Clone)]
#[command(name = "agri-form-server")]
#[command(about = "MCP server driving the crop recommendation / yield prediction form")]
#[command(version)]
pub struct Args {
    /// Base URL of the weather and prediction service
    #[arg(long, default_value = DEFAULT_API_BASE, env = "AGRI_API_BASE")]
    pub base_url: String,

    /// Which prediction the form feeds
    #[arg(long, value_enum, default_value = "crop", env = "AGRI_FORM_VARIANT")]
    pub variant: PredictionVariant,

    /// Location event that starts a weather lookup
    #[arg(long, value_enum, default_value = "blur", env = "AGRI_TRIGGER")]
    pub trigger: TriggerPolicy,

    /// Upper bound for each network call, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "AGRI_TIMEOUT_SECS")]
    pub timeout_secs: u64,
}

impl Args {
    pub fn profile(&self) -> FormProfile {
        FormProfile::new(self.variant, self.trigger)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
