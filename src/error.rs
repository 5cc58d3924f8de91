use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Sensing Error: {0}")]
    Sensing(#[from] SensingError),
    #[error("Sink Error: {0}")]
    Sink(#[from] SinkError),
    #[error("Catalog Error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Pipeline Error: {0}")]
    Pipeline(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// Failures of the frame grabber or the landmark model. Never fatal to the poll loop.
#[derive(Error, Debug)]
pub enum SensingError {
    #[error("Failed to grab frame: {0}")]
    Frame(String),
    #[error("Landmark estimation failed: {0}")]
    Estimation(String),
    #[error("Landmark estimation timed out")]
    Timeout,
    #[error("Failed to load replay file: {0}")]
    Replay(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Capture request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Capture rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Capture requires a target record but none is selected")]
    MissingTarget,
    #[error("Unexpected response body: {0}")]
    Decode(String),
    #[error("Capture task ended without reporting a result")]
    Dropped,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// Validation and uniqueness failures of the record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("A record with {field} `{value}` already exists")]
    Duplicate { field: &'static str, value: String },
}

impl CatalogError {
    /// HTTP-equivalent status for the rejection.
    pub fn status_code(&self) -> u16 {
        match self {
            CatalogError::MissingField(_) | CatalogError::Invalid { .. } => 400,
            CatalogError::Duplicate { .. } => 409,
        }
    }
}
