//! Remote authentication service contract
//!
//! The voice-matching backend is opaque. It answers every enrollment or
//! login submission with `{success, message}`. A transport failure is an
//! `Err(TransportError)`, never an `Ok` with `success == false`.

pub mod http;

use crate::audio::AudioBlob;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpAuthClient;

/// Enrollment sample count
pub const ENROLLMENT_SAMPLES: usize = 3;

/// Business answer from the authentication service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    /// Best voiceprint similarity reported by the backend (login only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// What the backend heard when the passphrase did not match (login only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoken: Option<String>,
    /// Account record echoed back on registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl AuthResponse {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            similarity: None,
            spoken: None,
            data: None,
        }
    }
}

/// Registration submission: identity fields plus 3 ordered samples
#[derive(Debug, Clone)]
pub struct RegistrationPayload {
    pub email: String,
    pub display_name: String,
    pub phone_number: String,
    pub locale: String,
    /// Index i was spoken against passphrase i of the locale
    pub samples: [AudioBlob; ENROLLMENT_SAMPLES],
}

/// Login submission: identifier, the passphrase shown, one sample
#[derive(Debug, Clone)]
pub struct LoginPayload {
    pub identifier: String,
    pub passphrase: String,
    pub locale: String,
    pub sample: AudioBlob,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, payload: &RegistrationPayload) -> Result<AuthResponse>;

    async fn authenticate(&self, payload: &LoginPayload) -> Result<AuthResponse>;
}
