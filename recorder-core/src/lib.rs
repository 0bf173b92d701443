//! # recorder-core
//!
//! Platform-agnostic meeting capture core.
//!
//! Captures microphone audio, speaker-loopback audio, and screen video
//! concurrently into one session folder, then mixes the two audio
//! tracks down into a combined file. Hardware access goes through the
//! `backend` traits; `recorder-cpal` provides the real implementation
//! and the integration tests provide scripted fakes.
//!
//! ## Architecture
//!
//! ```text
//! recorder-core (this crate)
//! ├── backend/      ← AudioHost, AudioInputStream, ScreenBackend, FrameSource, VideoSink
//! ├── models/       ← CaptureError, RecorderConfig, DeviceDescriptor, SessionStatus
//! ├── devices/      ← catalog (classify/priority/enumerate), selector (auto_select)
//! ├── session/      ← Recorder state machine, audio worker, video worker
//! └── processing/   ← WAV read/write, post-hoc mixer
//! ```

pub mod backend;
pub mod devices;
pub mod models;
pub mod processing;
pub mod session;

// Re-export key types at crate root for convenience.
pub use backend::audio::{AudioHost, AudioInputStream, StreamSpec};
pub use backend::video::{FrameSource, ScreenBackend, VideoSink};
pub use devices::catalog::{classify, enumerate, priority, DeviceCatalog};
pub use devices::selector::{auto_select, Selection};
pub use models::config::{RecorderConfig, FRAMES_PER_BLOCK};
pub use models::device::{DeviceDescriptor, DeviceTags};
pub use models::error::CaptureError;
pub use models::status::SessionStatus;
pub use session::Recorder;
