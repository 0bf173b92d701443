//! The screen capture worker.
//!
//! Grabs frames from the primary display and feeds them to the video
//! sink at the configured rate. Pacing uses a monotone next-deadline
//! accumulator, so a slow grab borrows from the following sleep instead
//! of shifting every later frame.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::backend::video::{bgra_to_rgb, ScreenBackend};
use crate::models::error::CaptureError;

pub(crate) struct VideoLoopContext {
    pub backend: Arc<dyn ScreenBackend>,
    pub path: PathBuf,
    pub frame_rate: u32,
    pub active: Arc<AtomicBool>,
}

pub(crate) fn run(ctx: VideoLoopContext) {
    if let Err(e) = capture(&ctx) {
        log::error!("error during screen recording: {e}");
    }
}

fn capture(ctx: &VideoLoopContext) -> Result<(), CaptureError> {
    let mut source = ctx.backend.open_source()?;
    let (width, height) = source.dimensions();
    let mut sink = ctx
        .backend
        .open_sink(&ctx.path, width, height, ctx.frame_rate)?;

    let frame_interval = Duration::from_secs_f64(1.0 / ctx.frame_rate as f64);
    let mut next_deadline = Instant::now();

    let result = loop {
        if !ctx.active.load(Ordering::SeqCst) {
            break Ok(());
        }

        let frame = match source.grab() {
            Ok(frame) => frame,
            Err(e) => break Err(e),
        };
        if let Err(e) = sink.write_frame(&bgra_to_rgb(&frame)) {
            break Err(e);
        }

        next_deadline += frame_interval;
        let now = Instant::now();
        if next_deadline > now {
            thread::sleep(next_deadline - now);
        }
    };

    // Finalize on every exit path; an unfinished container is unplayable.
    if let Err(e) = sink.finish() {
        log::error!("failed to finalize video sink: {e}");
    }

    if result.is_ok() {
        log::info!("screen recording completed");
    }
    result
}
