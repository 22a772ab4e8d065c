//! Microphone input via CPAL
//!
//! Thread Safety:
//! The cpal stream is not Send on every platform, so it is built, played and
//! dropped inside a dedicated worker thread. Chunks and the stop signal cross
//! the thread boundary over crossbeam channels.

use super::{AudioFormat, AudioInputDevice, ChannelStream, InputStream, StopSignal};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, unbounded, Sender};
use serde::{Deserialize, Serialize};

/// Device information for enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub host: String,
}

/// List all available input devices
pub fn list_input_devices() -> anyhow::Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let default_device_name = host.default_input_device().and_then(|d| d.name().ok());
    let host_id = host.id().name();

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        if let Ok(name) = device.name() {
            devices.push(DeviceInfo {
                is_default: Some(name.clone()) == default_device_name,
                name,
                host: host_id.to_string(),
            });
        }
    }

    Ok(devices)
}

/// Microphone-backed input device (preferred name, else system default)
pub struct CpalInputDevice {
    device_name: Option<String>,
}

impl CpalInputDevice {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn resolve(device_name: Option<&str>) -> Result<cpal::Device> {
        let host = cpal::default_host();

        if let Some(name) = device_name {
            if let Ok(mut devices) = host.input_devices() {
                if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    log::info!("✓ Resolved input device by name: {}", name);
                    return Ok(device);
                }
            }
            log::warn!("Device name '{}' not found, falling back to default", name);
        }

        host.default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("No input device available".to_string()))
    }
}

impl AudioInputDevice for CpalInputDevice {
    fn name(&self) -> String {
        self.device_name
            .clone()
            .unwrap_or_else(|| "default".to_string())
    }

    fn open(&self) -> Result<Box<dyn InputStream>> {
        let (chunk_tx, chunk_rx) = unbounded::<Vec<u8>>();
        let (stop_tx, stop_rx) = bounded::<StopSignal>(1);
        let (ready_tx, ready_rx) = bounded::<Result<AudioFormat>>(1);
        let device_name = self.device_name.clone();

        // Spawn worker thread (NOT tokio::spawn - the cpal stream must stay on this thread)
        let worker = std::thread::spawn(move || {
            let stream = match build_stream(device_name.as_deref(), chunk_tx) {
                Ok((stream, format)) => {
                    let _ = ready_tx.send(Ok(format));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Park until stopped (or the handle is dropped)
            let _ = stop_rx.recv();
            drop(stream);
            log::debug!("Capture worker stopped");
        });

        let format = ready_rx
            .recv()
            .map_err(|_| Error::DeviceUnavailable("capture worker exited".to_string()))??;

        Ok(Box::new(
            ChannelStream::new(format, chunk_rx).with_worker(stop_tx, worker),
        ))
    }
}

fn build_stream(
    device_name: Option<&str>,
    sender: Sender<Vec<u8>>,
) -> Result<(cpal::Stream, AudioFormat)> {
    let device = CpalInputDevice::resolve(device_name)?;
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    log::info!("Using audio device: {}", name);

    let supported_config = device
        .default_input_config()
        .map_err(|e| Error::DeviceUnavailable(format!("Failed to get input config: {}", e)))?;

    let sample_rate = supported_config.sample_rate().0;
    let channels = supported_config.channels();

    log::info!(
        "Device config: {} Hz, {} channels, format: {:?} (downmix={})",
        sample_rate,
        channels,
        supported_config.sample_format(),
        channels != 1
    );

    let stream_config = StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let channels_count = channels as usize;

    let stream = match supported_config.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &_| handle_input_f32(data, channels_count, &sender),
            |err| log::error!("Audio stream error: {}", err),
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &_| handle_input_i16(data, channels_count, &sender),
            |err| log::error!("Audio stream error: {}", err),
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &_| handle_input_u16(data, channels_count, &sender),
            |err| log::error!("Audio stream error: {}", err),
            None,
        ),
        other => {
            return Err(Error::DeviceUnavailable(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| Error::DeviceUnavailable(format!("Failed to build input stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| Error::DeviceUnavailable(format!("Failed to start input stream: {}", e)))?;

    Ok((
        stream,
        AudioFormat::Pcm16 {
            sample_rate,
            channels: 1,
        },
    ))
}

fn send_mono(mono: impl Iterator<Item = i16>, sender: &Sender<Vec<u8>>) {
    let bytes: Vec<u8> = mono.flat_map(|s| s.to_le_bytes()).collect();
    let _ = sender.send(bytes);
}

fn handle_input_f32(data: &[f32], channels: usize, sender: &Sender<Vec<u8>>) {
    let mono = data.chunks(channels).map(|chunk| {
        let avg = chunk.iter().sum::<f32>() / channels as f32;
        (avg.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
    });
    send_mono(mono, sender);
}

fn handle_input_i16(data: &[i16], channels: usize, sender: &Sender<Vec<u8>>) {
    let mono = data.chunks(channels).map(|chunk| {
        let avg: i32 = chunk.iter().map(|&s| s as i32).sum();
        (avg / channels as i32) as i16
    });
    send_mono(mono, sender);
}

fn handle_input_u16(data: &[u16], channels: usize, sender: &Sender<Vec<u8>>) {
    let mono = data.chunks(channels).map(|chunk| {
        let avg: i32 = chunk.iter().map(|&s| s as i32).sum();
        let avg_u16 = (avg / channels as i32) as u16;
        (avg_u16 as i32 - 32768) as i16
    });
    send_mono(mono, sender);
}
