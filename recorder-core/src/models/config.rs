use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of sample frames read from a hardware stream per block.
pub const FRAMES_PER_BLOCK: usize = 1024;

/// Configuration for a recording session.
///
/// Immutable for the duration of one session, except that the resolved
/// device indices may be replaced mid-session by the hot-swap protocol
/// in the audio loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Directory under which timestamped session folders are created.
    pub output_root: PathBuf,

    /// Optional label used as the session-folder prefix.
    pub session_label: Option<String>,

    /// Pinned microphone device index, or None to auto-select.
    pub mic_device: Option<u32>,

    /// Pinned speaker-loopback device index, or None to auto-select.
    pub speaker_device: Option<u32>,

    pub capture_mic: bool,
    pub capture_speaker: bool,
    pub capture_screen: bool,

    /// Screen capture rate in frames per second.
    pub video_frame_rate: u32,

    /// Audio sample rate in Hz.
    pub audio_sample_rate: u32,

    /// Requested channel count (1 = mono, 2 = stereo). Clamped per
    /// stream to the device's maximum input channels.
    pub channel_count: u16,

    /// Wall-clock interval between device hot-swap checks.
    #[serde(with = "duration_secs")]
    pub device_check_interval: Duration,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.video_frame_rate == 0 {
            return Err("video frame rate must be positive".into());
        }
        if self.audio_sample_rate == 0 {
            return Err("audio sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.channel_count) {
            return Err(format!("unsupported channel count: {}", self.channel_count));
        }
        if self.device_check_interval.is_zero() {
            return Err("device check interval must be positive".into());
        }
        Ok(())
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("./recordings"),
            session_label: None,
            mic_device: None,
            speaker_device: None,
            capture_mic: true,
            capture_speaker: true,
            capture_screen: true,
            video_frame_rate: 10,
            audio_sample_rate: 44100,
            channel_count: 1,
            device_check_interval: Duration::from_secs(2),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RecorderConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_frame_rate_rejected() {
        let config = RecorderConfig {
            video_frame_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn surround_channel_count_rejected() {
        let config = RecorderConfig {
            channel_count: 6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
