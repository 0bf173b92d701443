use crate::models::config::FRAMES_PER_BLOCK;
use crate::models::device::DeviceDescriptor;
use crate::models::error::CaptureError;

/// Parameters for opening an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    /// Interleaved channel count. Callers clamp this to the device's
    /// `max_input_channels` before opening.
    pub channels: u16,
}

/// Interface for platform-specific audio backends.
///
/// Implemented by `CpalHost` in `recorder-cpal` and by scripted fakes in
/// the integration tests. Enumeration is a stateless query: each call
/// re-reads the hardware snapshot, and nothing is cached between calls.
pub trait AudioHost: Send + Sync {
    /// All endpoints currently visible to the host, capture-capable or not.
    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError>;

    /// Index of the OS-reported default input device, if any.
    fn default_input(&self) -> Option<u32>;

    /// Index of the OS-reported default output device, if any.
    fn default_output(&self) -> Option<u32>;

    /// Open a capture stream against `device_index`.
    ///
    /// A trial open is this call followed by dropping the stream.
    fn open_input(
        &self,
        device_index: u32,
        spec: StreamSpec,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError>;
}

/// One open hardware capture stream.
///
/// Exclusively owned by the loop that opened it; closed by dropping.
pub trait AudioInputStream: Send {
    /// Read one block of [`FRAMES_PER_BLOCK`] frames of interleaved
    /// 16-bit samples. Blocks until the hardware has delivered a full
    /// block. Overflow must not surface as an error; dropped samples are
    /// acceptable.
    fn read_block(&mut self) -> Result<Vec<i16>, CaptureError>;

    /// Interleaved channel count actually granted by the device.
    fn channels(&self) -> u16;
}

/// Samples in one interleaved block for a stream with `channels` channels.
pub fn block_len(channels: u16) -> usize {
    FRAMES_PER_BLOCK * channels as usize
}
