//! Error types for the flow field background.

use wasm_bindgen::JsValue;

/// Everything that can keep the background from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The noise field could not be seeded.
    #[error("noise source unavailable: {0}")]
    NoiseUnavailable(String),
    /// A browser collaborator is missing or a JS call threw.
    #[error("host error: {0}")]
    Host(String),
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<JsValue> for Error {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value));
        Error::Host(message)
    }
}
