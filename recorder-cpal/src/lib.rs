//! # recorder-cpal
//!
//! Hardware backend for recorder-core.
//!
//! Provides:
//! - `CpalHost` — audio device enumeration and capture streams via cpal
//! - `ScrapScreen` — primary-display frame grabbing via scrap, encoded
//!   to mp4 through an ffmpeg child process
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use recorder_core::{Recorder, RecorderConfig};
//! use recorder_cpal::{CpalHost, ScrapScreen};
//!
//! let mut recorder = Recorder::new(
//!     RecorderConfig::default(),
//!     Arc::new(CpalHost::new()),
//!     Some(Arc::new(ScrapScreen)),
//! )?;
//! recorder.start()?;
//! ```

pub mod host;
pub mod screen;

pub use host::CpalHost;
pub use screen::ScrapScreen;
