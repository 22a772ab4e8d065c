//! Enrollment: identity form + 3 sequential passphrase captures
//!
//! Sample i is always spoken against passphrase i of the selected locale.
//! The form must be valid before any capture begins, and the locale is
//! locked once the first capture has started.

use crate::audio::{AudioBlob, AudioInputDevice, CaptureSession, DeviceArbiter};
use crate::auth::{AuthResponse, AuthService, RegistrationPayload, ENROLLMENT_SAMPLES};
use crate::catalog::PassphraseCatalog;
use crate::error::{Error, Result};
use crate::validation::{FormField, IdentityForm};
use serde::Serialize;
use std::sync::Arc;

/// Device arbiter label for enrollment captures
pub const OWNER: &str = "enrollment";

/// Snapshot for rendering
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentStatus {
    pub locale: String,
    pub form: IdentityForm,
    pub invalid_fields: Vec<String>,
    pub form_valid: bool,
    pub samples_recorded: usize,
    pub samples_required: usize,
    pub recording: bool,
    pub ready_to_submit: bool,
    pub next_passphrase: Option<String>,
    pub last_result: Option<AuthResponse>,
}

pub struct EnrollmentCoordinator {
    catalog: Arc<PassphraseCatalog>,
    device: Arc<dyn AudioInputDevice>,
    arbiter: DeviceArbiter,
    auth: Arc<dyn AuthService>,
    form: IdentityForm,
    locale: String,
    samples: Vec<AudioBlob>,
    session: Option<CaptureSession>,
    last_result: Option<AuthResponse>,
}

impl EnrollmentCoordinator {
    pub fn new(
        catalog: Arc<PassphraseCatalog>,
        device: Arc<dyn AudioInputDevice>,
        arbiter: DeviceArbiter,
        auth: Arc<dyn AuthService>,
        locale: &str,
    ) -> Result<Self> {
        if !catalog.contains(locale) {
            return Err(Error::UnknownLocale(locale.to_string()));
        }

        Ok(Self {
            catalog,
            device,
            arbiter,
            auth,
            form: IdentityForm::default(),
            locale: locale.to_string(),
            samples: Vec::with_capacity(ENROLLMENT_SAMPLES),
            session: None,
            last_result: None,
        })
    }

    pub fn form(&self) -> &IdentityForm {
        &self.form
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn samples(&self) -> &[AudioBlob] {
        &self.samples
    }

    pub fn is_recording(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_recording())
    }

    pub fn ready_to_submit(&self) -> bool {
        self.samples.len() == ENROLLMENT_SAMPLES
    }

    pub fn last_result(&self) -> Option<&AuthResponse> {
        self.last_result.as_ref()
    }

    pub fn update_field(&mut self, field: FormField, value: &str) {
        self.form.set(field, value);
    }

    /// Switch locale; refused once a capture has started
    pub fn set_locale(&mut self, locale: &str) -> Result<()> {
        if locale == self.locale {
            return Ok(());
        }
        if !self.catalog.contains(locale) {
            return Err(Error::UnknownLocale(locale.to_string()));
        }
        if !self.samples.is_empty() || self.session.is_some() {
            log::warn!(
                "Locale change to '{}' rejected: {} samples already recorded",
                locale,
                self.samples.len()
            );
            return Err(Error::LocaleLockedDuringEnrollment);
        }

        log::info!("Enrollment locale: {} -> {}", self.locale, locale);
        self.locale = locale.to_string();
        Ok(())
    }

    /// Passphrase the next capture will be bound to
    pub fn next_passphrase(&self) -> Option<&str> {
        if self.ready_to_submit() {
            return None;
        }
        self.catalog
            .phrase_at(&self.locale, self.samples.len())
            .ok()
    }

    fn invalid_fields(&self) -> Vec<String> {
        self.form
            .errors()
            .into_iter()
            .map(|(field, _)| field.wire_name().to_string())
            .collect()
    }

    /// Start capturing the next sample; returns the passphrase to speak
    pub async fn begin_capture(&mut self) -> Result<String> {
        let fields = self.invalid_fields();
        if !fields.is_empty() {
            log::warn!("Capture refused, invalid fields: {}", fields.join(", "));
            return Err(Error::InvalidForm { fields });
        }
        if self.ready_to_submit() {
            return Err(Error::AlreadyComplete);
        }

        let index = self.samples.len();
        let passphrase = self.catalog.phrase_at(&self.locale, index)?.to_string();

        let mut session = CaptureSession::new(OWNER, Arc::clone(&self.device), self.arbiter.clone())
            .bound_to(&passphrase);
        session.start().await?;

        log::info!(
            "Enrollment sample {}/{} recording ({})",
            index + 1,
            ENROLLMENT_SAMPLES,
            self.locale
        );
        self.session = Some(session);
        Ok(passphrase)
    }

    /// Finish the active capture; returns the number of samples recorded
    pub async fn end_capture(&mut self) -> Result<usize> {
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
        log::debug!("Enrollment sample {} is {} bytes", self.samples.len() + 1, blob.len());
        self.samples.push(blob);

        if self.ready_to_submit() {
            log::info!("Enrollment ready to submit");
        }
        Ok(self.samples.len())
    }

    /// Register the identity with its 3 samples
    ///
    /// A positive answer resets the form and samples (locale is kept). A
    /// negative answer or a transport error leaves the samples in place.
    pub async fn submit(&mut self) -> Result<AuthResponse> {
        if !self.ready_to_submit() || !self.form.is_valid() {
            return Err(Error::Incomplete {
                recorded: self.samples.len(),
                required: ENROLLMENT_SAMPLES,
            });
        }

        let samples: [AudioBlob; ENROLLMENT_SAMPLES] =
            self.samples
                .clone()
                .try_into()
                .map_err(|_| Error::Incomplete {
                    recorded: self.samples.len(),
                    required: ENROLLMENT_SAMPLES,
                })?;

        let payload = RegistrationPayload {
            email: self.form.email.trim().to_string(),
            display_name: self.form.display_name.trim().to_string(),
            phone_number: self.form.phone_number.trim().to_string(),
            locale: self.locale.clone(),
            samples,
        };

        log::info!("Submitting enrollment for {} ({})", payload.email, payload.locale);
        let response = match self.auth.register(&payload).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Enrollment submission failed: {}", e);
                return Err(e);
            }
        };

        if response.success {
            log::info!("Enrollment accepted: {}", response.message);
            self.form = IdentityForm::default();
            self.samples.clear();
        } else {
            log::warn!("Enrollment rejected: {}", response.message);
        }
        self.last_result = Some(response.clone());
        Ok(response)
    }

    /// Drop the form, samples and any active capture
    pub fn abandon(&mut self) {
        if self.session.take().is_some() {
            log::info!("Active enrollment capture discarded");
        }
        self.form = IdentityForm::default();
        self.samples.clear();
        self.last_result = None;
    }

    pub fn status(&self) -> EnrollmentStatus {
        let invalid_fields = self.invalid_fields();
        EnrollmentStatus {
            locale: self.locale.clone(),
            form: self.form.clone(),
            form_valid: invalid_fields.is_empty(),
            invalid_fields,
            samples_recorded: self.samples.len(),
            samples_required: ENROLLMENT_SAMPLES,
            recording: self.is_recording(),
            ready_to_submit: self.ready_to_submit(),
            next_passphrase: self.next_passphrase().map(str::to_string),
            last_result: self.last_result.clone(),
        }
    }
}
