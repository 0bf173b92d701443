//! Device catalog: enumeration, name classification, and selection scoring.
//!
//! Pure computation over a snapshot of hardware metadata. Classification
//! is string matching only; it feeds the priority score and user-facing
//! labels, never correctness decisions.

use crate::backend::audio::AudioHost;
use crate::models::device::{DeviceDescriptor, DeviceTags};
use crate::models::error::CaptureError;

const HEADPHONE_KEYWORDS: &[&str] = &[
    "headphone", "headset", "airpods", "earbuds", "beats", "bluetooth", "wireless", "usb audio",
];
const BUILTIN_KEYWORDS: &[&str] = &["built-in", "internal", "integrated"];
const EXTERNAL_KEYWORDS: &[&str] = &["external", "usb", "thunderbolt", "displayport"];
const VIRTUAL_KEYWORDS: &[&str] = &["loopback", "virtual", "aggregate", "blackhole", "soundflower"];
const MIC_KEYWORDS: &[&str] = &["microphone", "mic", "input"];
const SPEAKER_KEYWORDS: &[&str] = &["speaker", "output", "playback"];

/// Capture-capable and playback-capable devices, as separate lists.
/// An endpoint with both input and output channels appears in both.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    pub microphones: Vec<DeviceDescriptor>,
    pub speakers: Vec<DeviceDescriptor>,
}

/// Enumerate all endpoints and split them by capability.
pub fn enumerate(host: &dyn AudioHost) -> Result<DeviceCatalog, CaptureError> {
    let mut catalog = DeviceCatalog::default();
    for device in host.devices()? {
        if device.is_input_capable() {
            catalog.microphones.push(device.clone());
        }
        if device.is_output_capable() {
            catalog.speakers.push(device);
        }
    }
    Ok(catalog)
}

fn matches_any(name: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| name.contains(kw))
}

/// Classify a device by display name. Pure and total: any input string
/// yields all six flags; matching is case-insensitive.
pub fn classify(device_name: &str) -> DeviceTags {
    let name = device_name.to_lowercase();
    DeviceTags {
        is_headphone: matches_any(&name, HEADPHONE_KEYWORDS),
        is_builtin: matches_any(&name, BUILTIN_KEYWORDS),
        is_external: matches_any(&name, EXTERNAL_KEYWORDS),
        is_virtual: matches_any(&name, VIRTUAL_KEYWORDS),
        is_mic: matches_any(&name, MIC_KEYWORDS),
        is_speaker: matches_any(&name, SPEAKER_KEYWORDS),
    }
}

/// Selection score for auto-detection; higher is a better recording choice.
///
/// Headphones score highest (feedback isolation, assumed fidelity),
/// virtual/loopback endpoints are penalized for mic selection. Category
/// bonuses are mutually exclusive with the highest-matching one winning.
pub fn priority(device: &DeviceDescriptor) -> i32 {
    let tags = classify(&device.name);
    let mut score = 0i32;

    if tags.is_headphone {
        score += 50;
    } else if tags.is_external {
        score += 20;
    } else if tags.is_builtin {
        score += 10;
    }

    if tags.is_virtual {
        score -= 50;
    }

    let channels = device.max_input_channels.max(device.max_output_channels) as i32;
    score += (channels * 2).min(10);

    if matches!(device.default_sample_rate, 44100 | 48000) {
        score += 5;
    }

    score
}

/// Sort candidates by descending priority; stable, so enumeration order
/// breaks ties.
pub fn rank(devices: &[DeviceDescriptor]) -> Vec<DeviceDescriptor> {
    let mut ranked = devices.to_vec();
    ranked.sort_by_key(|d| std::cmp::Reverse(priority(d)));
    ranked
}
