//! Post-hoc mix-down of the microphone and speaker recordings.
//!
//! The two streams share no clock and are not guaranteed to start or
//! end at the same wall-clock offset, so merging truncates to the
//! shorter stream rather than attempting timestamp alignment. Pairwise
//! averaging matches the observed source behavior; it can attenuate a
//! quiet source against a loud one and that is accepted as-is.

use std::path::Path;

use crate::models::error::CaptureError;
use crate::processing::wav;

/// Average two sample streams pairwise, truncated to the shorter one.
///
/// Widened to i32 before summing so full-scale inputs cannot wrap;
/// floor division narrows back to i16.
pub fn mix_samples(a: &[i16], b: &[i16]) -> Vec<i16> {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| ((x as i32 + y as i32).div_euclid(2)) as i16)
        .collect()
}

/// Read both waveform files, mix them down, and write the result.
///
/// The microphone file's channel count and sample rate are authoritative
/// for the output format.
pub fn merge(mic_path: &Path, speaker_path: &Path, out_path: &Path) -> Result<(), CaptureError> {
    let (mic_spec, mic_samples) = wav::read_wav(mic_path)?;
    let (_, speaker_samples) = wav::read_wav(speaker_path)?;

    let merged = mix_samples(&mic_samples, &speaker_samples);
    wav::write_wav(out_path, mic_spec, &merged)?;

    log::info!(
        "merged audio saved: {} ({} samples)",
        out_path.display(),
        merged.len()
    );
    Ok(())
}
