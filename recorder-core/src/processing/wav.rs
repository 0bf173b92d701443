//! Waveform file I/O.
//!
//! Hand-rolled 44-byte RIFF headers, 16-bit signed PCM only. The save
//! step writes each source's buffered blocks as one contiguous data
//! chunk; the mixer reads files back through [`read_wav`].

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Sample width is fixed at 16-bit signed across the whole pipeline.
pub const BIT_DEPTH: u16 = 16;

/// Format parameters of a waveform file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
}

/// Generate a 44-byte WAV RIFF header for 16-bit PCM.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * 2
/// [32-33]  block_align = channels * 2
/// [34-35]  16 (bit depth)
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_header(spec: WavSpec, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = spec.sample_rate * spec.channels as u32 * BIT_DEPTH as u32 / 8;
    let block_align = spec.channels * BIT_DEPTH / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&spec.channels.to_le_bytes());
    header[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BIT_DEPTH.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Write `samples` as a complete 16-bit PCM waveform file.
pub fn write_wav(path: &Path, spec: WavSpec, samples: &[i16]) -> Result<(), CaptureError> {
    let data_size = (samples.len() * 2) as u32;
    let mut data = Vec::with_capacity(WAV_HEADER_SIZE + samples.len() * 2);
    data.extend_from_slice(&generate_header(spec, data_size));
    for &sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }

    let mut file =
        File::create(path).map_err(|e| CaptureError::Storage(format!("create {path:?}: {e}")))?;
    file.write_all(&data)
        .map_err(|e| CaptureError::Storage(format!("write {path:?}: {e}")))?;
    Ok(())
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Read a 16-bit PCM waveform file written by [`write_wav`].
///
/// Accepts only the canonical single-data-chunk layout this crate
/// produces: RIFF/WAVE magic, PCM format code 1, 16-bit samples.
pub fn read_wav(path: &Path) -> Result<(WavSpec, Vec<i16>), CaptureError> {
    let mut file =
        File::open(path).map_err(|e| CaptureError::Storage(format!("open {path:?}: {e}")))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| CaptureError::Storage(format!("read {path:?}: {e}")))?;

    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::Storage(format!("{path:?}: truncated header")));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" || &bytes[12..16] != b"fmt " {
        return Err(CaptureError::Storage(format!("{path:?}: not a RIFF WAVE file")));
    }
    if read_u16(&bytes, 20) != 1 {
        return Err(CaptureError::Storage(format!("{path:?}: not PCM")));
    }
    if read_u16(&bytes, 34) != BIT_DEPTH {
        return Err(CaptureError::Storage(format!("{path:?}: not 16-bit")));
    }
    if &bytes[36..40] != b"data" {
        return Err(CaptureError::Storage(format!("{path:?}: missing data chunk")));
    }

    let spec = WavSpec {
        channels: read_u16(&bytes, 22),
        sample_rate: read_u32(&bytes, 24),
    };

    let data_size = read_u32(&bytes, 40) as usize;
    let available = bytes.len() - WAV_HEADER_SIZE;
    let data = &bytes[WAV_HEADER_SIZE..WAV_HEADER_SIZE + data_size.min(available)];

    let samples = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok((spec, samples))
}
