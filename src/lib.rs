// Library exports for Tauri
// This file is required for cdylib/staticlib builds

//! VoxSecure voice interaction core
//!
//! Passphrase enrollment and login over a shared audio input, submission to
//! the remote voice authentication service, and post-login voice commands.
//! The desktop shell (`src/main.rs`, `desktop` feature) only forwards UI
//! intents into these types.

pub mod audio;
pub mod auth;
pub mod catalog;
pub mod command;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod login;
pub mod paths;
pub mod session;
pub mod validation;

#[cfg(test)]
mod testing;

pub use audio::{AudioBlob, AudioFormat, AudioInputDevice, CaptureSession, DeviceArbiter};
pub use auth::{AuthResponse, AuthService, HttpAuthClient};
pub use catalog::PassphraseCatalog;
pub use command::{CommandCenter, CommandTable, Navigator, Target};
pub use config::AppConfig;
pub use enrollment::EnrollmentCoordinator;
pub use error::{friendly_error, Error, FriendlyError, Result};
pub use login::LoginCoordinator;
pub use paths::AppPaths;
pub use session::SessionStore;
