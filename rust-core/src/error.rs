//! Error types for the fallible edges of the crate.
//!
//! Navigation computations never fail; only configuration, route decoding,
//! the wake lock, and the JNI bridge report errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Wake lock error: {0}")]
    WakeLock(String),

    #[error("JNI error: {0}")]
    Jni(String),
}

impl From<jni::errors::Error> for NavError {
    fn from(e: jni::errors::Error) -> Self {
        NavError::Jni(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
