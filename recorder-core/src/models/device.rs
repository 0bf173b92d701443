use serde::{Deserialize, Serialize};

/// Snapshot of a hardware audio endpoint as reported by the backend.
///
/// Never mutated after enumeration; callers re-query the catalog when
/// they need a fresh view (device indices can change when hardware is
/// plugged or unplugged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Backend-assigned index, valid until the next hardware change.
    pub index: u32,
    /// Human-readable display name.
    pub name: String,
    /// Maximum input channels (0 = not capture-capable).
    pub max_input_channels: u16,
    /// Maximum output channels (0 = not playback-capable).
    pub max_output_channels: u16,
    /// Device-preferred sample rate in Hz.
    pub default_sample_rate: u32,
    /// Name of the host API exposing the device (e.g. "ALSA", "WASAPI").
    pub host_api: String,
}

impl DeviceDescriptor {
    pub fn is_input_capable(&self) -> bool {
        self.max_input_channels > 0
    }

    pub fn is_output_capable(&self) -> bool {
        self.max_output_channels > 0
    }
}

/// Name-derived classification flags for an audio device.
///
/// Produced by pure string matching over the lower-cased display name.
/// Used for selection scoring and user-facing labels, never for
/// correctness decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTags {
    pub is_headphone: bool,
    pub is_builtin: bool,
    pub is_external: bool,
    pub is_virtual: bool,
    pub is_mic: bool,
    pub is_speaker: bool,
}
