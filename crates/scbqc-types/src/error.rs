use thiserror::Error;

#[derive(Error, Debug)]
pub enum QcError {
    #[error("Measurement fault at {voltage:.3} V: {message}")]
    MeasurementFault { voltage: f64, message: String },

    #[error("Channel {channel} produced no usable samples")]
    EmptySeries { channel: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Routing to channel {channel} failed: {message}")]
    Routing { channel: String, message: String },

    #[error("Malformed artifact {path}: {message}")]
    ArtifactFormat { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type QcResult<T> = Result<T, QcError>;
