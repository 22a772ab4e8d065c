//! Speech-to-text over HTTP
//!
//! Records a fixed window from the input device, uploads it as WAV and reads
//! `{"text": "..."}` back. The caller holds the device lease for the whole
//! listen, so the device is opened directly rather than through a capture
//! session.

use super::recognizer::SpeechRecognizer;
use crate::audio::wav::package_for_upload;
use crate::auth::http::{file_part, http_client};
use crate::audio::{AudioBlob, AudioInputDevice};
use crate::config::RecognizerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    text: String,
}

pub struct RemoteTranscriber {
    client: Client,
    endpoint: Option<Url>,
    api_key: Option<String>,
    language: String,
    window: Duration,
    device: Arc<dyn AudioInputDevice>,
}

impl RemoteTranscriber {
    pub fn new(config: &RecognizerConfig, device: Arc<dyn AudioInputDevice>) -> Result<Self> {
        let endpoint = match (&config.endpoint, config.enabled) {
            (Some(endpoint), true) => Some(Url::parse(endpoint).map_err(|e| {
                Error::Config(format!("invalid recognizer endpoint '{}': {}", endpoint, e))
            })?),
            _ => None,
        };

        match &endpoint {
            Some(url) => log::info!("Speech recognition via {}", url),
            None => log::warn!("Speech recognition disabled (no endpoint configured)"),
        }

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            endpoint,
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            window: Duration::from_millis(config.listen_ms),
            device,
        })
    }

    async fn record(&self) -> Result<AudioBlob> {
        let device = Arc::clone(&self.device);
        let stream = tokio::task::spawn_blocking(move || device.open())
            .await
            .map_err(|e| Error::DeviceUnavailable(format!("device open task failed: {}", e)))??;

        tokio::time::sleep(self.window).await;

        let (format, bytes) = tokio::task::spawn_blocking(move || {
            let mut stream = stream;
            stream.close();
            let mut bytes = Vec::new();
            while let Some(chunk) = stream.try_next_chunk() {
                bytes.extend_from_slice(&chunk);
            }
            (stream.format(), bytes)
        })
        .await
        .map_err(|e| Error::DeviceUnavailable(format!("device close task failed: {}", e)))?;

        Ok(AudioBlob::new(format, bytes))
    }
}

#[async_trait]
impl SpeechRecognizer for RemoteTranscriber {
    fn is_supported(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn recognize(&self) -> Result<String> {
        let Some(endpoint) = self.endpoint.clone() else {
            return Err(Error::RecognitionUnsupported);
        };

        let blob = self.record().await?;
        log::debug!("Transcribing {} bytes", blob.len());
        let file = package_for_upload(&blob, "command")?;

        let form = multipart::Form::new()
            .text("language", self.language.clone())
            .part("file", file_part(file)?);

        let mut request = self.client.post(endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TransportError(format!(
                "transcription HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let body = response.bytes().await?;
        let transcript: TranscriptResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::TransportError(format!("malformed transcription: {}", e)))?;
        Ok(transcript.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve_once, ScriptedInput};

    fn config(endpoint: Option<String>) -> RecognizerConfig {
        RecognizerConfig {
            endpoint,
            api_key: Some("sk-test".to_string()),
            listen_ms: 10,
            ..RecognizerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_transcribes_recording() {
        let (base_url, request) = serve_once("200 OK", r#"{"text": " Open my Profile "}"#).await;
        let device = Arc::new(ScriptedInput::with_chunks(vec![vec![0, 1], vec![2, 3]]));
        let transcriber =
            RemoteTranscriber::new(&config(Some(format!("{}/transcribe", base_url))), device.clone())
                .unwrap();
        assert!(transcriber.is_supported());

        let text = transcriber.recognize().await.unwrap();
        assert_eq!(text, "Open my Profile");
        assert_eq!(device.open_count(), 1);
        assert_eq!(device.close_count(), 1);

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /transcribe "));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("filename=\"command.wav\""));
        assert!(request.contains("en-US"));
    }

    #[tokio::test]
    async fn test_without_endpoint_is_unsupported() {
        let device = Arc::new(ScriptedInput::with_chunks(vec![vec![0, 1]]));
        let transcriber = RemoteTranscriber::new(&config(None), device.clone()).unwrap();
        assert!(!transcriber.is_supported());
        assert_eq!(
            transcriber.recognize().await.unwrap_err(),
            Error::RecognitionUnsupported
        );
        assert_eq!(device.open_count(), 0);
    }

    #[test]
    fn test_disabled_ignores_endpoint() {
        let mut cfg = config(Some("http://127.0.0.1:9/stt".to_string()));
        cfg.enabled = false;
        let transcriber =
            RemoteTranscriber::new(&cfg, Arc::new(ScriptedInput::with_chunks(vec![]))).unwrap();
        assert!(!transcriber.is_supported());
    }

    #[tokio::test]
    async fn test_hung_service_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and never answer
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let mut cfg = config(Some(format!("http://{}/stt", addr)));
        cfg.timeout_secs = 1;
        let transcriber =
            RemoteTranscriber::new(&cfg, Arc::new(ScriptedInput::with_chunks(vec![vec![0, 1]])))
                .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(10), transcriber.recognize())
            .await
            .expect("transcription should not hang");
        assert!(matches!(result, Err(Error::TransportError(_))));
        server.abort();
    }

    #[tokio::test]
    async fn test_unavailable_device() {
        let transcriber = RemoteTranscriber::new(
            &config(Some("http://127.0.0.1:9/stt".to_string())),
            Arc::new(ScriptedInput::unavailable()),
        )
        .unwrap();
        assert!(matches!(
            transcriber.recognize().await,
            Err(Error::DeviceUnavailable(_))
        ));
    }
}
