use thiserror::Error;

/// Errors that can occur during capture operations.
///
/// Only configuration-time failures are ever surfaced synchronously to
/// callers; anything raised inside a capture loop is logged and degrades
/// the session instead of propagating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no usable microphone found")]
    NoMicrophone,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("encoding failed: {0}")]
    Encoding(String),
}
