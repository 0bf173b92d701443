use std::path::Path;

use crate::models::error::CaptureError;

/// Interface for platform-specific screen capture backends.
///
/// Implemented by `ScrapScreen` in `recorder-cpal` and by in-memory
/// fakes in the integration tests.
pub trait ScreenBackend: Send + Sync {
    /// Open a frame source for the primary display.
    fn open_source(&self) -> Result<Box<dyn FrameSource>, CaptureError>;

    /// Open a video sink writing to `path` at the given geometry and rate.
    fn open_sink(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> Result<Box<dyn VideoSink>, CaptureError>;
}

/// One open screen grabber.
pub trait FrameSource: Send {
    /// Pixel dimensions of the captured region.
    fn dimensions(&self) -> (u32, u32);

    /// Grab one frame as tightly-packed BGRA bytes (width * height * 4).
    /// Blocks until a frame is available.
    fn grab(&mut self) -> Result<Vec<u8>, CaptureError>;
}

/// One open video writer.
///
/// The container is only guaranteed valid after `finish()` returns.
pub trait VideoSink: Send {
    /// Write one tightly-packed RGB24 frame (width * height * 3).
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), CaptureError>;

    /// Finalize and close the container.
    fn finish(&mut self) -> Result<(), CaptureError>;
}

/// Convert a tightly-packed BGRA frame to RGB24, dropping alpha.
pub fn bgra_to_rgb(bgra: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(bgra.len() / 4 * 3);
    for px in bgra.chunks_exact(4) {
        rgb.push(px[2]);
        rgb.push(px[1]);
        rgb.push(px[0]);
    }
    rgb
}
