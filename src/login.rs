//! Login: one passphrase drawn per locale, one capture, one submission

use crate::audio::{AudioBlob, AudioInputDevice, CaptureSession, DeviceArbiter};
use crate::auth::{AuthResponse, AuthService, LoginPayload};
use crate::catalog::PassphraseCatalog;
use crate::error::{Error, Result};
use crate::session::SessionStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;

/// Device arbiter label for login captures
pub const OWNER: &str = "login";

#[derive(Debug, Clone, Serialize)]
pub struct LoginStatus {
    pub locale: String,
    pub passphrase: String,
    pub recording: bool,
    pub has_sample: bool,
    pub last_result: Option<AuthResponse>,
    pub authenticated: Option<String>,
}

pub struct LoginCoordinator {
    catalog: Arc<PassphraseCatalog>,
    device: Arc<dyn AudioInputDevice>,
    arbiter: DeviceArbiter,
    auth: Arc<dyn AuthService>,
    store: SessionStore,
    rng: StdRng,
    identifier: String,
    locale: String,
    passphrase: String,
    session: Option<CaptureSession>,
    sample: Option<AudioBlob>,
    last_result: Option<AuthResponse>,
}

impl LoginCoordinator {
    pub fn new(
        catalog: Arc<PassphraseCatalog>,
        device: Arc<dyn AudioInputDevice>,
        arbiter: DeviceArbiter,
        auth: Arc<dyn AuthService>,
        store: SessionStore,
        locale: &str,
    ) -> Result<Self> {
        let mut rng = StdRng::from_entropy();
        let passphrase = catalog.draw_with(locale, &mut rng)?.to_string();

        Ok(Self {
            catalog,
            device,
            arbiter,
            auth,
            store,
            rng,
            identifier: String::new(),
            locale: locale.to_string(),
            passphrase,
            session: None,
            sample: None,
            last_result: None,
        })
    }

    /// Reseed the passphrase draws and redraw for the current locale
    pub fn with_seed(mut self, seed: u64) -> Result<Self> {
        self.rng = StdRng::seed_from_u64(seed);
        self.passphrase = self.catalog.draw_with(&self.locale, &mut self.rng)?.to_string();
        Ok(self)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn sample(&self) -> Option<&AudioBlob> {
        self.sample.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_recording())
    }

    pub fn last_result(&self) -> Option<&AuthResponse> {
        self.last_result.as_ref()
    }

    /// Identifier of the last successful login, while the session still holds it
    ///
    /// A logout (or any other clear of the session store) ends it.
    pub fn authenticated(&self) -> Option<String> {
        match &self.last_result {
            Some(result) if result.success => self
                .store
                .identifier()
                .filter(|stored| *stored == self.identifier),
            _ => None,
        }
    }

    /// Select a locale and draw a fresh passphrase from it
    ///
    /// Any capture in progress, recorded sample or previous result is dropped.
    pub fn set_locale(&mut self, locale: &str) -> Result<&str> {
        let passphrase = self.catalog.draw_with(locale, &mut self.rng)?.to_string();

        if self.session.take().is_some() || self.sample.is_some() {
            log::info!("Locale change discards the current login attempt");
        }
        self.sample = None;
        self.last_result = None;
        self.locale = locale.to_string();
        self.passphrase = passphrase;

        log::info!("Login locale: {}", self.locale);
        Ok(&self.passphrase)
    }

    /// Start a new capture against the current passphrase
    pub async fn begin_capture(&mut self) -> Result<()> {
        let mut session = CaptureSession::new(OWNER, Arc::clone(&self.device), self.arbiter.clone())
            .bound_to(&self.passphrase);
        session.start().await?;

        // The previous sample only goes once the new capture is live
        if self.sample.take().is_some() {
            log::debug!("Previous login sample replaced");
        }
        self.session = Some(session);
        Ok(())
    }

    pub async fn end_capture(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Err(Error::NoActiveSession);
        };

        if let Err(e) = session.stop().await {
            // Keep a session that can still be stopped
            if session.is_recording() {
                self.session = Some(session);
            }
            return Err(e);
        }
        let blob = session.into_result()?;
        log::debug!("Login sample is {} bytes", blob.len());
        self.sample = Some(blob);
        Ok(())
    }

    /// Authenticate `identifier` with the recorded sample
    ///
    /// The sample is kept after the call so a failed attempt can be retried.
    pub async fn submit(&mut self, identifier: &str) -> Result<AuthResponse> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::MissingIdentifier);
        }
        let Some(sample) = self.sample.clone() else {
            return Err(Error::MissingSample);
        };

        let payload = LoginPayload {
            identifier: identifier.to_string(),
            passphrase: self.passphrase.clone(),
            locale: self.locale.clone(),
            sample,
        };

        log::info!("Submitting login for {} ({})", identifier, self.locale);
        let response = match self.auth.authenticate(&payload).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Login submission failed: {}", e);
                return Err(e);
            }
        };

        self.identifier = identifier.to_string();
        if response.success {
            log::info!("Login accepted for {}", identifier);
            self.store.set(identifier);
        } else {
            log::warn!("Login rejected for {}: {}", identifier, response.message);
        }
        self.last_result = Some(response.clone());
        Ok(response)
    }

    pub fn status(&self) -> LoginStatus {
        LoginStatus {
            locale: self.locale.clone(),
            passphrase: self.passphrase.clone(),
            recording: self.is_recording(),
            has_sample: self.sample.is_some(),
            last_result: self.last_result.clone(),
            authenticated: self.authenticated(),
        }
    }
}
