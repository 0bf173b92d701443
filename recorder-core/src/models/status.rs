use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Side-effect-free snapshot of a recording session.
///
/// Safe to request from any thread at any time, including while loops
/// are running. File-path fields are populated from the moment
/// `start()` returns and reset to None after `stop()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub recording: bool,
    pub session_folder: Option<PathBuf>,
    pub capture_mic: bool,
    pub capture_speaker: bool,
    pub capture_screen: bool,
    pub mic_file: Option<PathBuf>,
    pub speaker_file: Option<PathBuf>,
    pub video_file: Option<PathBuf>,
    pub merged_file: Option<PathBuf>,
    /// Device index currently in use for the microphone, tracking
    /// mid-session hot swaps.
    pub mic_device: Option<u32>,
    /// Device index currently in use for speaker loopback.
    pub speaker_device: Option<u32>,
}
