use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::audio::AudioHost;
use crate::backend::video::ScreenBackend;
use crate::devices::selector;
use crate::models::config::RecorderConfig;
use crate::models::error::CaptureError;
use crate::models::status::SessionStatus;
use crate::processing::{mixer, wav};
use crate::session::audio_loop::{self, AudioLoopContext};
use crate::session::video_loop::{self, VideoLoopContext};

/// How long `stop()` waits for a worker before abandoning the join.
/// A wedged hardware read can stall a worker indefinitely; the bound
/// trades a leaked thread for a controller that always returns.
const JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// An ordered, append-only sequence of raw PCM blocks for one source.
///
/// Single writer (the audio loop) while a session is active; read and
/// cleared only by `stop()` after the loop has been joined.
pub(crate) type BlockBuffer = Arc<Mutex<Vec<Vec<i16>>>>;

/// Controller-visible session fields, guarded by one coarse lock so
/// `start()`, `stop()`, and `status()` never observe a half-constructed
/// session.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub session_folder: Option<PathBuf>,
    pub mic_file: Option<PathBuf>,
    pub speaker_file: Option<PathBuf>,
    pub video_file: Option<PathBuf>,
    pub merged_file: Option<PathBuf>,
    /// Effective capture flags for the current session. The audio loop
    /// clears one durably when its stream cannot be opened.
    pub capture_mic: bool,
    pub capture_speaker: bool,
    /// Device indices currently in use; rewritten on hot swap.
    pub mic_device: Option<u32>,
    pub speaker_device: Option<u32>,
}

/// Concurrent multi-stream capture session.
///
/// Owns the recording flag, per-source block buffers, and the two worker
/// threads. Device access goes through the backend traits, so the whole
/// state machine runs unmodified against scripted fakes in tests.
///
/// ```text
/// [audio worker] → mic blocks ──┐
///                 speaker blocks ├→ stop(): save WAVs → Mixer → merged.wav
/// [video worker] → VideoSink ───┘
/// ```
pub struct Recorder {
    config: RecorderConfig,
    audio_host: Arc<dyn AudioHost>,
    screen: Option<Arc<dyn ScreenBackend>>,

    /// Broadcast cancellation flag; flipped once per session, read-only
    /// in the workers.
    active: Arc<AtomicBool>,
    shared: Arc<Mutex<SharedState>>,
    mic_blocks: BlockBuffer,
    speaker_blocks: BlockBuffer,

    audio_handle: Option<thread::JoinHandle<()>>,
    video_handle: Option<thread::JoinHandle<()>>,

    // Resolution outcome from construction, re-seeded into SharedState
    // on every start() so a mid-session degradation does not leak into
    // the next session.
    resolved_capture_mic: bool,
    resolved_capture_speaker: bool,
    resolved_mic_device: Option<u32>,
    resolved_speaker_device: Option<u32>,
}

impl Recorder {
    /// Resolve devices and build a session controller.
    ///
    /// The only fatal outcome is a requested microphone that cannot be
    /// resolved. An unusable speaker-loopback device disables speaker
    /// capture with a warning instead; screen capture is disabled when
    /// no backend is supplied.
    pub fn new(
        config: RecorderConfig,
        audio_host: Arc<dyn AudioHost>,
        screen: Option<Arc<dyn ScreenBackend>>,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let mut capture_speaker = config.capture_speaker;
        let mut mic_device = config.mic_device;
        let mut speaker_device = config.speaker_device;

        // Auto-selection runs at most once here; both sources share the
        // same pass when neither is pinned.
        let needs_mic = config.capture_mic && mic_device.is_none();
        let needs_speaker = capture_speaker && speaker_device.is_none();
        if needs_mic || needs_speaker {
            let selection = selector::auto_select(audio_host.as_ref());

            if needs_mic {
                match selection.mic {
                    Some(device) => {
                        log::info!("using microphone: {} (index {})", device.name, device.index);
                        mic_device = Some(device.index);
                    }
                    None => return Err(CaptureError::NoMicrophone),
                }
            }

            if needs_speaker {
                match selection.speaker {
                    Some(device) => {
                        log::info!("using speaker: {} (index {})", device.name, device.index);
                        speaker_device = Some(device.index);
                        if !audio_loop::probe_readable(
                            audio_host.as_ref(),
                            device.index,
                            &config,
                        ) {
                            log::warn!("no working speaker detected, disabling speaker capture");
                            capture_speaker = false;
                            speaker_device = None;
                        }
                    }
                    None => {
                        log::warn!("no working speaker detected, disabling speaker capture");
                        capture_speaker = false;
                    }
                }
            }
        }

        if config.capture_screen && screen.is_none() {
            log::warn!("no screen backend supplied, disabling screen capture");
        }

        Ok(Self {
            resolved_capture_mic: config.capture_mic,
            resolved_capture_speaker: capture_speaker,
            resolved_mic_device: mic_device,
            resolved_speaker_device: speaker_device,
            config,
            audio_host,
            screen,
            active: Arc::new(AtomicBool::new(false)),
            shared: Arc::new(Mutex::new(SharedState::default())),
            mic_blocks: Arc::new(Mutex::new(Vec::new())),
            speaker_blocks: Arc::new(Mutex::new(Vec::new())),
            audio_handle: None,
            video_handle: None,
        })
    }

    fn capture_screen(&self) -> bool {
        self.config.capture_screen && self.screen.is_some()
    }

    /// Begin recording. No-op with a warning if already active.
    ///
    /// Creates the session folder, seeds output paths, clears buffers,
    /// and launches the workers; returns as soon as they are spawned.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.load(Ordering::SeqCst) {
            log::warn!("recording already in progress");
            return Ok(());
        }

        let folder = self.create_session_folder()?;

        let capture_mic = self.resolved_capture_mic;
        let capture_speaker = self.resolved_capture_speaker;
        {
            let mut shared = self.shared.lock();
            shared.capture_mic = capture_mic;
            shared.capture_speaker = capture_speaker;
            shared.mic_device = self.resolved_mic_device;
            shared.speaker_device = self.resolved_speaker_device;
            shared.video_file = self.capture_screen().then(|| folder.join("screen.mp4"));
            shared.mic_file = capture_mic.then(|| folder.join("microphone.wav"));
            shared.speaker_file = capture_speaker.then(|| folder.join("speaker.wav"));
            shared.merged_file =
                (capture_mic && capture_speaker).then(|| folder.join("merged.wav"));
            shared.session_folder = Some(folder);
        }

        self.mic_blocks.lock().clear();
        self.speaker_blocks.lock().clear();
        self.active.store(true, Ordering::SeqCst);

        let run_audio = {
            let shared = self.shared.lock();
            shared.capture_mic || shared.capture_speaker
        };
        if run_audio {
            let ctx = AudioLoopContext {
                host: Arc::clone(&self.audio_host),
                config: self.config.clone(),
                active: Arc::clone(&self.active),
                shared: Arc::clone(&self.shared),
                mic_blocks: Arc::clone(&self.mic_blocks),
                speaker_blocks: Arc::clone(&self.speaker_blocks),
            };
            let handle = thread::Builder::new()
                .name("audio-capture".into())
                .spawn(move || audio_loop::run(ctx))
                .map_err(|e| CaptureError::Stream(format!("spawn audio worker: {e}")))?;
            self.audio_handle = Some(handle);
        }

        let video_target = match (&self.screen, self.shared.lock().video_file.clone()) {
            (Some(backend), Some(path)) => Some((Arc::clone(backend), path)),
            _ => None,
        };
        if let Some((backend, path)) = video_target {
            let ctx = VideoLoopContext {
                backend,
                path,
                frame_rate: self.config.video_frame_rate,
                active: Arc::clone(&self.active),
            };
            let handle = thread::Builder::new()
                .name("screen-capture".into())
                .spawn(move || video_loop::run(ctx))
                .map_err(|e| CaptureError::Stream(format!("spawn video worker: {e}")))?;
            self.video_handle = Some(handle);
        }

        log::info!("recording started");
        Ok(())
    }

    /// Stop recording. No-op with a warning if not active.
    ///
    /// Joins both workers, then (when `persist`) flushes buffers to
    /// waveform files and mixes them down. Buffers and path fields are
    /// always cleared, so `persist = false` is "discard this recording".
    pub fn stop(&mut self, persist: bool) {
        if !self.active.load(Ordering::SeqCst) {
            log::warn!("no recording in progress");
            return;
        }

        log::info!("stopping recording (persist={persist})");
        self.active.store(false, Ordering::SeqCst);

        if let Some(handle) = self.video_handle.take() {
            join_bounded(handle, "screen-capture");
        }
        if let Some(handle) = self.audio_handle.take() {
            join_bounded(handle, "audio-capture");
        }

        if persist {
            self.save_audio();
            self.merge_audio();
            if let Some(folder) = &self.shared.lock().session_folder {
                log::info!("recording saved to: {}", folder.display());
            }
        } else {
            log::info!("recording stopped without saving output");
        }

        self.mic_blocks.lock().clear();
        self.speaker_blocks.lock().clear();

        let mut shared = self.shared.lock();
        shared.session_folder = None;
        shared.mic_file = None;
        shared.speaker_file = None;
        shared.video_file = None;
        shared.merged_file = None;
    }

    /// Snapshot of the current session. Safe from any thread.
    pub fn status(&self) -> SessionStatus {
        let shared = self.shared.lock();
        SessionStatus {
            recording: self.active.load(Ordering::SeqCst),
            session_folder: shared.session_folder.clone(),
            capture_mic: shared.capture_mic,
            capture_speaker: shared.capture_speaker,
            capture_screen: self.capture_screen(),
            mic_file: shared.mic_file.clone(),
            speaker_file: shared.speaker_file.clone(),
            video_file: shared.video_file.clone(),
            merged_file: shared.merged_file.clone(),
            mic_device: shared.mic_device,
            speaker_device: shared.speaker_device,
        }
    }

    fn create_session_folder(&self) -> Result<PathBuf, CaptureError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let prefix = self.config.session_label.as_deref().unwrap_or("recording");
        let folder = self.config.output_root.join(format!("{prefix}_{timestamp}"));
        std::fs::create_dir_all(&folder)
            .map_err(|e| CaptureError::Storage(format!("create {folder:?}: {e}")))?;
        Ok(folder)
    }

    /// Flush each enabled source's buffer to its waveform file. An
    /// enabled source with an empty buffer logs a warning and writes
    /// nothing; callers treat the missing file as "nothing captured".
    fn save_audio(&self) {
        let spec = wav::WavSpec {
            channels: self.config.channel_count,
            sample_rate: self.config.audio_sample_rate,
        };
        let (mic_file, speaker_file, capture_mic, capture_speaker) = {
            let shared = self.shared.lock();
            (
                shared.mic_file.clone(),
                shared.speaker_file.clone(),
                shared.capture_mic,
                shared.capture_speaker,
            )
        };

        if capture_mic {
            if let Some(path) = mic_file {
                write_source(&path, spec, &self.mic_blocks, "microphone");
            }
        }
        if capture_speaker {
            if let Some(path) = speaker_file {
                write_source(&path, spec, &self.speaker_blocks, "speaker");
            }
        }
    }

    /// Invoke the mixer when both sources were captured with data.
    /// Any failure is logged; a missing merged file degrades the
    /// session without failing it.
    fn merge_audio(&self) {
        let shared = self.shared.lock();
        if !(shared.capture_mic && shared.capture_speaker) {
            return;
        }
        if self.mic_blocks.lock().is_empty() || self.speaker_blocks.lock().is_empty() {
            log::warn!("cannot merge audio: one or both audio streams were not recorded");
            return;
        }
        let (Some(mic), Some(speaker), Some(merged)) = (
            shared.mic_file.as_deref(),
            shared.speaker_file.as_deref(),
            shared.merged_file.as_deref(),
        ) else {
            log::warn!("cannot merge audio: one or more required file paths are missing");
            return;
        };
        if let Err(e) = mixer::merge(mic, speaker, merged) {
            log::error!("error merging audio: {e}");
        }
    }
}

fn write_source(path: &std::path::Path, spec: wav::WavSpec, blocks: &BlockBuffer, label: &str) {
    let blocks = blocks.lock();
    if blocks.is_empty() {
        log::warn!("{label} was set to record, but no audio blocks were captured");
        return;
    }
    let samples: Vec<i16> = blocks.iter().flatten().copied().collect();
    match wav::write_wav(path, spec, &samples) {
        Ok(()) => log::info!("{label} audio saved: {}", path.display()),
        Err(e) => log::error!("error saving {label} audio: {e}"),
    }
}

/// Join a worker with [`JOIN_TIMEOUT`]; a worker that never exits is
/// abandoned with an error log rather than hanging the controller.
fn join_bounded(handle: thread::JoinHandle<()>, name: &str) {
    let deadline = Instant::now() + JOIN_TIMEOUT;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            log::error!("{name} worker did not exit within {JOIN_TIMEOUT:?}; abandoning join");
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    if handle.join().is_err() {
        log::error!("{name} worker panicked");
    }
}
