//! One record → stop → blob cycle against the shared audio input.
//!
//! Sessions are single use. A coordinator creates a fresh session for every
//! capture and drops it (or keeps only its blob) afterwards.

use super::{AudioBlob, AudioInputDevice, DeviceArbiter, DeviceLease, InputStream};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopped,
}

pub struct CaptureSession {
    owner: String,
    passphrase: Option<String>,
    device: Arc<dyn AudioInputDevice>,
    arbiter: DeviceArbiter,
    state: CaptureState,
    // Fields drop in order: the stream must be gone before the lease frees the input
    stream: Option<Box<dyn InputStream>>,
    lease: Option<DeviceLease>,
    chunks: Vec<Vec<u8>>,
    audio: Option<AudioBlob>,
    started_at: Option<Instant>,
}

impl CaptureSession {
    pub fn new(owner: &str, device: Arc<dyn AudioInputDevice>, arbiter: DeviceArbiter) -> Self {
        Self {
            owner: owner.to_string(),
            passphrase: None,
            device,
            arbiter,
            state: CaptureState::Idle,
            stream: None,
            lease: None,
            chunks: Vec::new(),
            audio: None,
            started_at: None,
        }
    }

    /// Bind the passphrase the user is expected to speak
    pub fn bound_to(mut self, passphrase: &str) -> Self {
        self.passphrase = Some(passphrase.to_string());
        self
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// Acquire the input and begin buffering chunks
    ///
    /// Fails with [`Error::DeviceBusy`] if any session (this one included)
    /// holds the input, or [`Error::DeviceUnavailable`] if the device cannot
    /// be opened. A stopped session cannot be restarted.
    pub async fn start(&mut self) -> Result<()> {
        match self.state {
            CaptureState::Idle => {}
            CaptureState::Recording => {
                return Err(Error::DeviceBusy {
                    holder: self.owner.clone(),
                })
            }
            CaptureState::Stopped => return Err(Error::AlreadyComplete),
        }

        let lease = self.arbiter.try_acquire(&self.owner)?;

        let device = Arc::clone(&self.device);
        let stream = tokio::task::spawn_blocking(move || device.open())
            .await
            .map_err(|e| Error::DeviceUnavailable(format!("device open task failed: {}", e)))??;

        log::info!(
            "Capture started ({}) on '{}'{}",
            self.owner,
            self.device.name(),
            self.passphrase
                .as_deref()
                .map(|p| format!(", passphrase \"{}\"", p))
                .unwrap_or_default()
        );

        self.lease = Some(lease);
        self.stream = Some(stream);
        self.started_at = Some(Instant::now());
        self.state = CaptureState::Recording;
        Ok(())
    }

    /// Move chunks that have arrived so far into the session buffer
    pub fn pump(&mut self) -> usize {
        let mut moved = 0;
        if let Some(stream) = self.stream.as_mut() {
            while let Some(chunk) = stream.try_next_chunk() {
                self.chunks.push(chunk);
                moved += 1;
            }
        }
        moved
    }

    /// Stop recording and finalize the blob
    ///
    /// No-op from Idle (returns None) or Stopped (returns the same blob).
    pub async fn stop(&mut self) -> Result<Option<&AudioBlob>> {
        if self.state != CaptureState::Recording {
            return Ok(self.audio.as_ref());
        }

        self.pump();

        let Some(mut stream) = self.stream.take() else {
            return Err(Error::NoActiveSession);
        };

        // Closing joins the platform worker, so keep it off the async thread
        let closed = tokio::task::spawn_blocking(move || {
            stream.close();
            let mut tail = Vec::new();
            while let Some(chunk) = stream.try_next_chunk() {
                tail.push(chunk);
            }
            (stream, tail)
        })
        .await;

        let (stream, tail) = match closed {
            Ok(closed) => closed,
            Err(e) => {
                // The stream went down with the task; nothing left to finalize
                log::error!("Capture close failed ({}): {}", self.owner, e);
                self.chunks.clear();
                self.lease = None;
                self.state = CaptureState::Stopped;
                return Err(Error::DeviceUnavailable(format!(
                    "device close task failed: {}",
                    e
                )));
            }
        };

        self.chunks.extend(tail);
        let format = stream.format();
        drop(stream);

        let chunk_count = self.chunks.len();
        let bytes: Vec<u8> = self.chunks.drain(..).flatten().collect();
        let blob = AudioBlob::new(format, bytes);

        // Release the input only after the stream is gone
        self.lease = None;
        self.state = CaptureState::Stopped;

        log::info!(
            "Capture stopped ({}): {} chunks, {} bytes{}",
            self.owner,
            chunk_count,
            blob.len(),
            blob.duration_ms()
                .map(|ms| format!(", {} ms", ms))
                .unwrap_or_default()
        );
        if let Some(started) = self.started_at {
            log::debug!("Capture wall time: {:?}", started.elapsed());
        }

        self.audio = Some(blob);
        Ok(self.audio.as_ref())
    }

    /// Finalized blob; [`Error::NotReady`] unless stopped
    pub fn result(&self) -> Result<&AudioBlob> {
        match (self.state, self.audio.as_ref()) {
            (CaptureState::Stopped, Some(blob)) => Ok(blob),
            _ => Err(Error::NotReady),
        }
    }

    pub fn into_result(self) -> Result<AudioBlob> {
        match self.state {
            CaptureState::Stopped => self.audio.ok_or(Error::NotReady),
            _ => Err(Error::NotReady),
        }
    }
}
