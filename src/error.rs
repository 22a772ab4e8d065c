//! Error taxonomy for the voice interaction core.
//!
//! Every failure the coordinators, capture sessions and command center can
//! report is a variant here. None of them is fatal: the component that
//! returned the error stays usable and the caller may retry.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input device could not be acquired (permission, hardware, driver).
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Another capture or listening session holds the input device.
    #[error("audio input device busy (held by {holder})")]
    DeviceBusy { holder: String },

    /// Capture result requested before the session was stopped.
    #[error("capture session has not produced a recording yet")]
    NotReady,

    #[error("no capture session is active")]
    NoActiveSession,

    /// Identity form failed validation; lists the offending fields.
    #[error("identity form is invalid: {}", fields.join(", "))]
    InvalidForm { fields: Vec<String> },

    #[error("enrollment incomplete: {recorded}/{required} samples recorded")]
    Incomplete { recorded: usize, required: usize },

    #[error("an identifier is required to log in")]
    MissingIdentifier,

    #[error("no recorded sample to submit")]
    MissingSample,

    #[error("unknown locale: {0}")]
    UnknownLocale(String),

    #[error("passphrase index {index} out of range for '{locale}' ({len} phrases)")]
    IndexOutOfRange {
        locale: String,
        index: usize,
        len: usize,
    },

    /// Locale cannot change once enrollment capture has started.
    #[error("locale is locked while enrollment samples exist")]
    LocaleLockedDuringEnrollment,

    #[error("all enrollment samples are already recorded")]
    AlreadyComplete,

    #[error("voice command recognition is already listening")]
    AlreadyListening,

    #[error("speech recognition is not supported on this device")]
    RecognitionUnsupported,

    /// Network call could not complete. Distinct from a negative answer.
    #[error("transport error: {0}")]
    TransportError(String),

    #[error("invalid passphrase catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            Error::DeviceUnavailable(_) => "device_unavailable",
            Error::DeviceBusy { .. } => "device_busy",
            Error::NotReady => "not_ready",
            Error::NoActiveSession => "no_active_session",
            Error::InvalidForm { .. } => "invalid_form",
            Error::Incomplete { .. } => "incomplete",
            Error::MissingIdentifier => "missing_identifier",
            Error::MissingSample => "missing_sample",
            Error::UnknownLocale(_) => "unknown_locale",
            Error::IndexOutOfRange { .. } => "index_out_of_range",
            Error::LocaleLockedDuringEnrollment => "locale_locked",
            Error::AlreadyComplete => "already_complete",
            Error::AlreadyListening => "already_listening",
            Error::RecognitionUnsupported => "recognition_unsupported",
            Error::TransportError(_) => "transport",
            Error::InvalidCatalog(_) => "invalid_catalog",
            Error::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::TransportError(err.to_string())
    }
}

/// Friendly error message with error code, for rendering in the UI
#[derive(Debug, Clone, Serialize)]
pub struct FriendlyError {
    pub message: String,
    pub code: String,
    pub technical: String,
}

/// Map core errors to user-friendly messages
pub fn friendly_error(error: &Error) -> FriendlyError {
    let message = match error {
        Error::DeviceUnavailable(_) => {
            "Microphone is not available. Check your system's microphone settings."
        }
        Error::DeviceBusy { .. } => {
            "The microphone is already in use. Finish the current recording and try again."
        }
        Error::NotReady | Error::NoActiveSession => "Start a recording first.",
        Error::InvalidForm { .. } => {
            "Please fill out all fields with valid information before recording."
        }
        Error::Incomplete { .. } => "Please complete all fields and record all 3 passphrases.",
        Error::MissingIdentifier => "Enter your email or username.",
        Error::MissingSample => "Record the passphrase before logging in.",
        Error::UnknownLocale(_) => "That language is not available.",
        Error::IndexOutOfRange { .. } | Error::InvalidCatalog(_) | Error::Config(_) => {
            "The application is misconfigured. Please contact support."
        }
        Error::LocaleLockedDuringEnrollment => {
            "The language cannot be changed after you started recording passphrases."
        }
        Error::AlreadyComplete => "All passphrases are recorded. Submit your registration.",
        Error::AlreadyListening => "Already listening...",
        Error::RecognitionUnsupported => "Speech recognition is not supported on this device.",
        Error::TransportError(_) => {
            "Could not reach the authentication service. Please try again."
        }
    };

    FriendlyError {
        message: message.to_string(),
        code: error.code().to_string(),
        technical: error.to_string(),
    }
}
