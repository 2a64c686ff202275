/// User agent string for HTTP requests
pub const USER_AGENT: &str = "agri-form-server/0.1.0";

/// Base URL of the local recommendation / prediction service
pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

/// Weather lookup path, takes a `state` query parameter
pub const WEATHER_PATH: &str = "/weather";

/// Crop recommendation endpoint
pub const RECOMMEND_CROP_PATH: &str = "/recommend-crop";

/// Yield prediction endpoint
pub const PREDICT_YIELD_PATH: &str = "/api/predict-yield";

/// Upper bound for either network call when nothing else is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How long an MCP tool waits for a network attempt to settle before
/// returning the in-progress state
pub const SETTLE_WAIT_SECS: u64 = 30;
