//! scrap-backed screen capture and an ffmpeg-subprocess video sink.
//!
//! Frames come from scrap's primary-display capturer as BGRA; the core
//! converts to RGB24 and the sink pipes raw frames into an ffmpeg child
//! process that encodes H.264 into the session's mp4 file. Requires an
//! `ffmpeg` binary on PATH.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::Duration;

use scrap::{Capturer, Display};

use recorder_core::backend::video::{FrameSource, ScreenBackend, VideoSink};
use recorder_core::models::error::CaptureError;

pub struct ScrapScreen;

impl ScreenBackend for ScrapScreen {
    fn open_source(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let display = Display::primary()
            .map_err(|e| CaptureError::Stream(format!("primary display: {e}")))?;
        let capturer = Capturer::new(display)
            .map_err(|e| CaptureError::Stream(format!("open capturer: {e}")))?;
        Ok(Box::new(ScrapSource {
            width: capturer.width() as u32,
            height: capturer.height() as u32,
            capturer,
        }))
    }

    fn open_sink(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> Result<Box<dyn VideoSink>, CaptureError> {
        FfmpegSink::spawn(path, width, height, frame_rate).map(|s| Box::new(s) as Box<dyn VideoSink>)
    }
}

struct ScrapSource {
    capturer: Capturer,
    width: u32,
    height: u32,
}

// The capturer is created and used only on the screen-capture thread;
// the impl exists to satisfy the FrameSource bound.
unsafe impl Send for ScrapSource {}

impl FrameSource for ScrapSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
        loop {
            match self.capturer.frame() {
                Ok(frame) => {
                    // scrap rows may carry stride padding; copy the
                    // visible width of each row.
                    let stride = frame.len() / self.height as usize;
                    let row_bytes = self.width as usize * 4;
                    let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
                    for row in 0..self.height as usize {
                        let start = row * stride;
                        packed.extend_from_slice(&frame[start..start + row_bytes]);
                    }
                    return Ok(packed);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(1));
                }
                Err(e) => return Err(CaptureError::Stream(format!("frame grab: {e}"))),
            }
        }
    }
}

/// Pipes raw RGB24 frames into an ffmpeg child encoding to mp4.
struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl FfmpegSink {
    fn spawn(
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> Result<Self, CaptureError> {
        let mut child = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-video_size")
            .arg(format!("{width}x{height}"))
            .arg("-framerate")
            .arg(frame_rate.to_string())
            .arg("-i")
            .arg("-")
            .arg("-c:v")
            .arg("libx264")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Encoding(format!("spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CaptureError::Encoding("ffmpeg stdin unavailable".into()))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
        })
    }
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), CaptureError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CaptureError::Encoding("sink already finished".into()))?;
        stdin
            .write_all(rgb)
            .map_err(|e| CaptureError::Encoding(format!("write frame: {e}")))
    }

    fn finish(&mut self) -> Result<(), CaptureError> {
        // Closing stdin signals end of input; ffmpeg then finalizes the
        // container on its own.
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| CaptureError::Encoding(format!("wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(CaptureError::Encoding(format!("ffmpeg exited with {status}")));
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            drop(self.stdin.take());
            let _ = self.child.wait();
        }
    }
}
