//! HTTP client for the voice authentication backend.
//!
//! Both calls are multipart POSTs answered with `{success, message}` JSON:
//! `POST {base}/register` and `POST {base}/login`.

use super::{AuthResponse, AuthService, LoginPayload, RegistrationPayload};
use crate::audio::wav::{package_for_upload, UploadFile};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use std::time::Duration;
use url::Url;

/// Authentication service reached over HTTP
pub struct HttpAuthClient {
    client: Client,
    base_url: Url,
}

impl HttpAuthClient {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        // Url::join replaces the last segment unless the base ends with '/'
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("invalid auth base_url '{}': {}", base, e)))?;

        let client = http_client(config.timeout_secs)?;

        log::info!("Auth service endpoint: {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid endpoint '{}': {}", path, e)))
    }

    async fn post_form(&self, path: &str, form: multipart::Form) -> Result<AuthResponse> {
        let url = self.endpoint(path)?;
        log::debug!("POST {}", url);

        let response = self.client.post(url).multipart(form).send().await?;
        handle_response(response).await
    }
}

/// HTTP client with a request timeout (`0` leaves requests unbounded)
pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    let mut builder = Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn file_part(file: UploadFile) -> Result<multipart::Part> {
    Ok(multipart::Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.mime)?)
}

async fn handle_response(response: Response) -> Result<AuthResponse> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        log::warn!("Auth service returned HTTP {}: {}", status.as_u16(), text);
        return Err(Error::TransportError(format!(
            "HTTP {}: {}",
            status.as_u16(),
            text.trim()
        )));
    }

    serde_json::from_slice::<AuthResponse>(&body)
        .map_err(|e| Error::TransportError(format!("malformed response: {}", e)))
}

#[async_trait]
impl AuthService for HttpAuthClient {
    async fn register(&self, payload: &RegistrationPayload) -> Result<AuthResponse> {
        let mut form = multipart::Form::new()
            .text("email", payload.email.clone())
            .text("name", payload.display_name.clone())
            .text("mobile", payload.phone_number.clone())
            .text("language", payload.locale.clone());

        // Order of the parts is the order of the passphrases
        for (i, sample) in payload.samples.iter().enumerate() {
            let file = package_for_upload(sample, &format!("recording_{}", i + 1))?;
            form = form.part("recordings", file_part(file)?);
        }

        let response = self.post_form("register", form).await?;
        log::info!(
            "Registration for {}: success={} ({})",
            payload.email,
            response.success,
            response.message
        );
        Ok(response)
    }

    async fn authenticate(&self, payload: &LoginPayload) -> Result<AuthResponse> {
        let file = package_for_upload(&payload.sample, "recording")?;
        let form = multipart::Form::new()
            .text("email", payload.identifier.clone())
            .text("passphrase", payload.passphrase.clone())
            .text("language", payload.locale.clone())
            .part("recording", file_part(file)?);

        let response = self.post_form("login", form).await?;
        log::info!(
            "Login for {}: success={} ({})",
            payload.identifier,
            response.success,
            response.message
        );
        Ok(response)
    }
}
