//! Packaging of captured blobs for upload
//!
//! PCM recordings are wrapped in a RIFF/WAV container; already-encoded
//! recordings are passed through with their own mime type.

use super::{AudioBlob, AudioFormat};
use crate::error::{Error, Result};
use std::io::Cursor;

/// A recording ready to be attached to a multipart request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Encode little-endian i16 PCM bytes as a WAV file
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    if pcm.len() % 2 != 0 {
        log::warn!("Dropping trailing odd byte from PCM buffer ({} bytes)", pcm.len());
    }

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(packaging_error)?;
        for sample in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .map_err(packaging_error)?;
        }
        writer.finalize().map_err(packaging_error)?;
    }

    Ok(cursor.into_inner())
}

/// Build the upload file for a blob, named `<stem>.<ext>`
pub fn package_for_upload(blob: &AudioBlob, stem: &str) -> Result<UploadFile> {
    match &blob.format {
        AudioFormat::Pcm16 {
            sample_rate,
            channels,
        } => Ok(UploadFile {
            file_name: format!("{}.wav", stem),
            mime: "audio/wav".to_string(),
            bytes: encode_wav(&blob.bytes, *sample_rate, *channels)?,
        }),
        AudioFormat::Encoded { mime } => Ok(UploadFile {
            file_name: format!("{}.{}", stem, extension_for(mime)),
            mime: mime.clone(),
            bytes: blob.bytes.clone(),
        }),
    }
}

fn extension_for(mime: &str) -> &str {
    match mime.split(';').next().unwrap_or(mime).trim() {
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        _ => "bin",
    }
}

fn packaging_error(e: hound::Error) -> Error {
    Error::TransportError(format!("failed to package recording: {}", e))
}
