//! The audio capture worker.
//!
//! One thread serves both audio sources: each iteration reads one block
//! per open stream and appends it to that source's buffer. Failures
//! degrade a single source, never the loop; only the shared `active`
//! flag ends it. A periodic re-selection pass tolerates a device being
//! unplugged and replaced mid-recording.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::audio::{AudioHost, AudioInputStream, StreamSpec};
use crate::devices::selector;
use crate::models::config::RecorderConfig;
use crate::models::error::CaptureError;
use crate::session::recorder::{BlockBuffer, SharedState};

/// Scheduler-yield pause between iterations. Reads are already paced by
/// hardware buffering; this only keeps the loop polite under contention.
const ITERATION_YIELD: Duration = Duration::from_millis(1);

pub(crate) struct AudioLoopContext {
    pub host: Arc<dyn AudioHost>,
    pub config: RecorderConfig,
    pub active: Arc<AtomicBool>,
    pub shared: Arc<Mutex<SharedState>>,
    pub mic_blocks: BlockBuffer,
    pub speaker_blocks: BlockBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Mic,
    Speaker,
}

impl SourceKind {
    fn label(self) -> &'static str {
        match self {
            SourceKind::Mic => "microphone",
            SourceKind::Speaker => "speaker",
        }
    }
}

/// Per-source capture state. `stream = None` after open failure or a
/// failed recovery means the source is abandoned for the session.
struct Source {
    kind: SourceKind,
    device_index: u32,
    stream: Option<Box<dyn AudioInputStream>>,
    blocks: BlockBuffer,
}

/// Look up the device and clamp the requested channel count to what the
/// hardware reports; never request more channels than it has.
fn clamped_spec(
    host: &dyn AudioHost,
    device_index: u32,
    config: &RecorderConfig,
) -> StreamSpec {
    let max_channels = host
        .devices()
        .ok()
        .and_then(|devices| {
            devices
                .into_iter()
                .find(|d| d.index == device_index)
                .map(|d| d.max_input_channels)
        })
        .unwrap_or(config.channel_count);
    StreamSpec {
        sample_rate: config.audio_sample_rate,
        channels: config.channel_count.min(max_channels.max(1)),
    }
}

fn open_stream(
    host: &dyn AudioHost,
    device_index: u32,
    config: &RecorderConfig,
) -> Result<Box<dyn AudioInputStream>, CaptureError> {
    let spec = clamped_spec(host, device_index, config);
    let stream = host.open_input(device_index, spec)?;
    log::info!(
        "stream opened (device {device_index}, channels: {})",
        stream.channels()
    );
    Ok(stream)
}

/// Open a stream and read one block from it, verifying the device can
/// actually deliver capture data. Used by configure-time speaker checks.
pub(crate) fn probe_readable(
    host: &dyn AudioHost,
    device_index: u32,
    config: &RecorderConfig,
) -> bool {
    match open_stream(host, device_index, config) {
        Ok(mut stream) => match stream.read_block() {
            Ok(_) => true,
            Err(e) => {
                log::warn!("capture test failed on device {device_index}: {e}");
                false
            }
        },
        Err(e) => {
            log::warn!("capture test failed on device {device_index}: {e}");
            false
        }
    }
}

pub(crate) fn run(ctx: AudioLoopContext) {
    let mut sources = open_sources(&ctx);
    let mut last_device_check = Instant::now();

    while ctx.active.load(Ordering::SeqCst) {
        if last_device_check.elapsed() >= ctx.config.device_check_interval {
            last_device_check = Instant::now();
            check_device_changes(&ctx, &mut sources);
        }

        for source in &mut sources {
            read_one_block(&ctx, source);
        }

        thread::sleep(ITERATION_YIELD);
    }

    // Drop order closes whatever is still open; close-time failures in
    // the backends must never keep this thread alive.
    drop(sources);
    log::info!("audio recording completed");
}

/// Open one stream per enabled source. An open failure durably disables
/// that source for the session (no retry) and is reflected in the shared
/// state so `status()` reports the degradation.
fn open_sources(ctx: &AudioLoopContext) -> Vec<Source> {
    let (capture_mic, capture_speaker, mic_device, speaker_device) = {
        let shared = ctx.shared.lock();
        (
            shared.capture_mic,
            shared.capture_speaker,
            shared.mic_device,
            shared.speaker_device,
        )
    };

    let mut sources = Vec::new();
    let wanted = [
        (SourceKind::Mic, capture_mic, mic_device, &ctx.mic_blocks),
        (
            SourceKind::Speaker,
            capture_speaker,
            speaker_device,
            &ctx.speaker_blocks,
        ),
    ];

    for (kind, enabled, device, blocks) in wanted {
        if !enabled {
            continue;
        }
        let Some(device_index) = device else {
            log::error!("{} capture enabled but no device resolved", kind.label());
            disable_source(ctx, kind);
            continue;
        };
        match open_stream(ctx.host.as_ref(), device_index, &ctx.config) {
            Ok(stream) => sources.push(Source {
                kind,
                device_index,
                stream: Some(stream),
                blocks: Arc::clone(blocks),
            }),
            Err(e) => {
                log::error!("failed to open {} stream: {e}", kind.label());
                disable_source(ctx, kind);
            }
        }
    }

    sources
}

fn disable_source(ctx: &AudioLoopContext, kind: SourceKind) {
    let mut shared = ctx.shared.lock();
    match kind {
        SourceKind::Mic => shared.capture_mic = false,
        SourceKind::Speaker => shared.capture_speaker = false,
    }
}

/// Re-run auto-selection and reopen any source whose resolved index has
/// moved. A changed index is assumed to mean a changed physical device;
/// a false positive costs one unnecessary reopen, which is accepted.
fn check_device_changes(ctx: &AudioLoopContext, sources: &mut [Source]) {
    let selection = selector::auto_select(ctx.host.as_ref());

    for source in sources.iter_mut() {
        if source.stream.is_none() {
            continue;
        }
        let resolved = match source.kind {
            SourceKind::Mic => selection.mic.as_ref(),
            SourceKind::Speaker => selection.speaker.as_ref(),
        };
        let Some(device) = resolved else { continue };
        if device.index == source.device_index {
            continue;
        }

        log::info!(
            "{} device changed from {} to {}, switching",
            source.kind.label(),
            source.device_index,
            device.index
        );
        source.stream = None;
        match open_stream(ctx.host.as_ref(), device.index, &ctx.config) {
            Ok(stream) => {
                source.stream = Some(stream);
                source.device_index = device.index;
                let mut shared = ctx.shared.lock();
                match source.kind {
                    SourceKind::Mic => shared.mic_device = Some(device.index),
                    SourceKind::Speaker => shared.speaker_device = Some(device.index),
                }
                log::info!(
                    "switched {} to device {}",
                    source.kind.label(),
                    device.index
                );
            }
            Err(e) => {
                log::error!(
                    "failed to switch {} to device {}: {e}; source abandoned",
                    source.kind.label(),
                    device.index
                );
            }
        }
    }
}

/// Read one block, appending it to the source's buffer. A read error
/// gets one recovery attempt (reopen against the same index); if that
/// also fails the source is abandoned while the loop keeps serving the
/// other one.
fn read_one_block(ctx: &AudioLoopContext, source: &mut Source) {
    let Some(stream) = source.stream.as_mut() else {
        return;
    };

    match stream.read_block() {
        Ok(block) => source.blocks.lock().push(block),
        Err(e) => {
            log::warn!("{} read error: {e}", source.kind.label());
            source.stream = None;
            match open_stream(ctx.host.as_ref(), source.device_index, &ctx.config) {
                Ok(stream) => {
                    log::info!("{} stream recovered", source.kind.label());
                    source.stream = Some(stream);
                }
                Err(recovery_error) => {
                    log::error!(
                        "failed to recover {} stream: {recovery_error}; source abandoned",
                        source.kind.label()
                    );
                }
            }
        }
    }
}
