//! Audio input seam and capture sessions
//!
//! The core never talks to a platform audio API directly. Adapters implement
//! [`AudioInputDevice`] and hand back an [`InputStream`] that yields raw
//! chunks in arrival order. The [`DeviceArbiter`] makes sure only one
//! capture (or voice-command listen) holds the input at a time.

pub mod session;
pub mod wav;

cfg_if::cfg_if! {
    if #[cfg(feature = "desktop")] {
        pub mod cpal_input;
    }
}

use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::JoinHandle;

pub use session::{CaptureSession, CaptureState};

/// Sample rate used when the device lets us choose (16 kHz)
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Layout of the bytes carried by captured chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioFormat {
    /// Little-endian signed 16-bit PCM, interleaved
    Pcm16 { sample_rate: u32, channels: u16 },
    /// Already containerized audio (e.g. `audio/webm`)
    Encoded { mime: String },
}

/// Finalized recording: chunks concatenated in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub format: AudioFormat,
    pub bytes: Vec<u8>,
}

impl AudioBlob {
    pub fn new(format: AudioFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Duration for PCM blobs; None for encoded audio
    pub fn duration_ms(&self) -> Option<u64> {
        match self.format {
            AudioFormat::Pcm16 {
                sample_rate,
                channels,
            } if sample_rate > 0 && channels > 0 => {
                let frames = self.bytes.len() as u64 / (2 * channels as u64);
                Some(frames * 1000 / sample_rate as u64)
            }
            _ => None,
        }
    }
}

/// Platform audio input (microphone-like)
///
/// `open` acquires the hardware and starts delivering chunks. It fails with
/// [`Error::DeviceUnavailable`] when permission is denied or no hardware exists.
pub trait AudioInputDevice: Send + Sync {
    fn name(&self) -> String;

    fn open(&self) -> Result<Box<dyn InputStream>>;
}

/// An open input stream
pub trait InputStream: Send {
    fn format(&self) -> AudioFormat;

    /// Next buffered chunk, if any. Never blocks.
    fn try_next_chunk(&mut self) -> Option<Vec<u8>>;

    /// Stop the hardware. Chunks captured before the stop stay readable.
    fn close(&mut self);
}

/// Signal type for stopping a capture worker
#[derive(Debug, Clone, Copy)]
pub struct StopSignal;

/// Input stream fed by a crossbeam channel, optionally backed by a worker
/// thread that owns the platform stream
pub struct ChannelStream {
    format: AudioFormat,
    chunks: Receiver<Vec<u8>>,
    stop_tx: Option<Sender<StopSignal>>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelStream {
    pub fn new(format: AudioFormat, chunks: Receiver<Vec<u8>>) -> Self {
        Self {
            format,
            chunks,
            stop_tx: None,
            worker: None,
        }
    }

    /// Attach the worker thread that produces chunks and its stop channel
    pub fn with_worker(mut self, stop_tx: Sender<StopSignal>, worker: JoinHandle<()>) -> Self {
        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        self
    }
}

impl InputStream for ChannelStream {
    fn format(&self) -> AudioFormat {
        self.format.clone()
    }

    fn try_next_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.try_recv().ok()
    }

    fn close(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Best effort: the worker may already be gone
            let _ = stop_tx.send(StopSignal);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Capture worker panicked while stopping");
            }
        }
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Process-wide exclusive ownership of the audio input
///
/// Cloning shares the same underlying lock. Enrollment, login and the voice
/// command center must all be built with clones of one arbiter.
#[derive(Clone, Default)]
pub struct DeviceArbiter {
    holder: Arc<Mutex<Option<String>>>,
}

impl DeviceArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the input for `owner`, or fail with [`Error::DeviceBusy`]
    pub fn try_acquire(&self, owner: &str) -> Result<DeviceLease> {
        let mut holder = self.holder.lock();
        if let Some(current) = holder.as_ref() {
            log::warn!(
                "Audio input requested by '{}' while held by '{}'",
                owner,
                current
            );
            return Err(Error::DeviceBusy {
                holder: current.clone(),
            });
        }

        *holder = Some(owner.to_string());
        log::debug!("Audio input acquired by '{}'", owner);

        Ok(DeviceLease {
            holder: Arc::clone(&self.holder),
            owner: owner.to_string(),
        })
    }

    /// Current holder label, if the input is held
    pub fn holder(&self) -> Option<String> {
        self.holder.lock().clone()
    }

    pub fn is_held(&self) -> bool {
        self.holder.lock().is_some()
    }
}

/// Exclusive hold on the audio input; released on drop
pub struct DeviceLease {
    holder: Arc<Mutex<Option<String>>>,
    owner: String,
}

impl DeviceLease {
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        *self.holder.lock() = None;
        log::debug!("Audio input released by '{}'", self.owner);
    }
}

/// Input device that is never available (no microphone support compiled in)
pub struct UnsupportedInput;

impl AudioInputDevice for UnsupportedInput {
    fn name(&self) -> String {
        "unsupported".to_string()
    }

    fn open(&self) -> Result<Box<dyn InputStream>> {
        Err(Error::DeviceUnavailable(
            "no audio input backend in this build".to_string(),
        ))
    }
}

/// Default input for this build: cpal when the desktop feature is on
pub fn default_input_device(device_name: Option<String>) -> Arc<dyn AudioInputDevice> {
    #[cfg(feature = "desktop")]
    {
        Arc::new(cpal_input::CpalInputDevice::new(device_name))
    }
    #[cfg(not(feature = "desktop"))]
    {
        log::warn!(
            "No audio backend compiled in; input {:?} unavailable",
            device_name
        );
        Arc::new(UnsupportedInput)
    }
}
