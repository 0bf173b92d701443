//! Scripted in-memory backends for exercising the session state machine
//! without hardware.
#![allow(dead_code)] // each test binary uses a different slice of this module

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use recorder_core::backend::audio::{block_len, AudioHost, AudioInputStream, StreamSpec};
use recorder_core::backend::video::{FrameSource, ScreenBackend, VideoSink};
use recorder_core::models::device::DeviceDescriptor;
use recorder_core::models::error::CaptureError;

pub fn input_device(index: u32, name: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        index,
        name: name.into(),
        max_input_channels: 1,
        max_output_channels: 0,
        default_sample_rate: 44100,
        host_api: "fake".into(),
    }
}

pub fn output_device(index: u32, name: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        index,
        name: name.into(),
        max_input_channels: 1,
        max_output_channels: 2,
        default_sample_rate: 44100,
        host_api: "fake".into(),
    }
}

/// A block of `value` repeated for one full mono read.
pub fn block(value: i16) -> Vec<i16> {
    vec![value; block_len(1)]
}

/// What one scripted stream does after its listed steps run out.
#[derive(Debug, Clone, Copy)]
pub enum Exhausted {
    /// Every further read fails.
    Fail,
    /// Every further read yields a paced silence block.
    Silence,
}

pub enum ReadStep {
    Block(Vec<i16>),
    Fail,
}

pub struct ScriptedStream {
    steps: VecDeque<ReadStep>,
    exhausted: Exhausted,
}

impl ScriptedStream {
    pub fn new(steps: Vec<ReadStep>, exhausted: Exhausted) -> Self {
        Self {
            steps: steps.into(),
            exhausted,
        }
    }

    /// A stream that yields the given blocks and then fails every read.
    pub fn blocks_then_fail(blocks: Vec<Vec<i16>>) -> Self {
        Self::new(blocks.into_iter().map(ReadStep::Block).collect(), Exhausted::Fail)
    }
}

impl AudioInputStream for ScriptedStream {
    fn read_block(&mut self) -> Result<Vec<i16>, CaptureError> {
        match self.steps.pop_front() {
            Some(ReadStep::Block(samples)) => Ok(samples),
            Some(ReadStep::Fail) => Err(CaptureError::Stream("scripted read failure".into())),
            None => match self.exhausted {
                Exhausted::Fail => Err(CaptureError::Stream("scripted stream exhausted".into())),
                Exhausted::Silence => {
                    // Pace roughly like hardware so buffers stay bounded.
                    std::thread::sleep(Duration::from_millis(2));
                    Ok(block(0))
                }
            },
        }
    }

    fn channels(&self) -> u16 {
        1
    }
}

/// A stream that repeats one value forever, paced.
pub struct RepeatingStream(pub i16);

impl AudioInputStream for RepeatingStream {
    fn read_block(&mut self) -> Result<Vec<i16>, CaptureError> {
        std::thread::sleep(Duration::from_millis(2));
        Ok(block(self.0))
    }

    fn channels(&self) -> u16 {
        1
    }
}

pub type StreamFactory =
    Box<dyn Fn() -> Result<Box<dyn AudioInputStream>, CaptureError> + Send + Sync>;

/// Scripted audio host: a fixed device list, mutable defaults, and one
/// stream factory per device index. Every `open_input` invokes the
/// factory, so trial opens and reopens are observable.
pub struct FakeHost {
    devices: Vec<DeviceDescriptor>,
    default_input: Mutex<Option<u32>>,
    default_output: Mutex<Option<u32>>,
    factories: Mutex<HashMap<u32, StreamFactory>>,
    open_count: Mutex<HashMap<u32, usize>>,
    open_specs: Mutex<HashMap<u32, StreamSpec>>,
}

impl FakeHost {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            default_input: Mutex::new(None),
            default_output: Mutex::new(None),
            factories: Mutex::new(HashMap::new()),
            open_count: Mutex::new(HashMap::new()),
            open_specs: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_default_input(&self, index: Option<u32>) {
        *self.default_input.lock() = index;
    }

    pub fn set_default_output(&self, index: Option<u32>) {
        *self.default_output.lock() = index;
    }

    pub fn set_factory<F>(&self, index: u32, factory: F)
    where
        F: Fn() -> Result<Box<dyn AudioInputStream>, CaptureError> + Send + Sync + 'static,
    {
        self.factories.lock().insert(index, Box::new(factory));
    }

    /// Register a device whose every open yields an endless repeating
    /// stream of `value`.
    pub fn set_repeating(&self, index: u32, value: i16) {
        self.set_factory(index, move || Ok(Box::new(RepeatingStream(value))));
    }

    /// Register a device that always refuses to open.
    pub fn set_unopenable(&self, index: u32) {
        self.set_factory(index, || Err(CaptureError::DeviceNotAvailable));
    }

    pub fn opens_for(&self, index: u32) -> usize {
        self.open_count.lock().get(&index).copied().unwrap_or(0)
    }

    /// The `StreamSpec` handed to the most recent open of `index`.
    pub fn last_spec_for(&self, index: u32) -> Option<StreamSpec> {
        self.open_specs.lock().get(&index).copied()
    }
}

impl AudioHost for FakeHost {
    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        Ok(self.devices.clone())
    }

    fn default_input(&self) -> Option<u32> {
        *self.default_input.lock()
    }

    fn default_output(&self) -> Option<u32> {
        *self.default_output.lock()
    }

    fn open_input(
        &self,
        device_index: u32,
        spec: StreamSpec,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError> {
        *self.open_count.lock().entry(device_index).or_insert(0) += 1;
        self.open_specs.lock().insert(device_index, spec);
        match self.factories.lock().get(&device_index) {
            Some(factory) => factory(),
            None => Err(CaptureError::DeviceNotAvailable),
        }
    }
}

/// Shared record of what a fake video session produced.
#[derive(Debug, Default)]
pub struct VideoRecord {
    pub frames: Vec<Vec<u8>>,
    pub finished: bool,
}

pub struct FakeScreen {
    pub width: u32,
    pub height: u32,
    pub record: Arc<Mutex<VideoRecord>>,
}

impl FakeScreen {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            record: Arc::new(Mutex::new(VideoRecord::default())),
        }
    }
}

impl ScreenBackend for FakeScreen {
    fn open_source(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(CountingSource {
            width: self.width,
            height: self.height,
            frame_no: 0,
        }))
    }

    fn open_sink(
        &self,
        _path: &Path,
        _width: u32,
        _height: u32,
        _frame_rate: u32,
    ) -> Result<Box<dyn VideoSink>, CaptureError> {
        Ok(Box::new(RecordingSink {
            record: Arc::clone(&self.record),
        }))
    }
}

/// BGRA frames whose blue channel carries the frame number.
struct CountingSource {
    width: u32,
    height: u32,
    frame_no: u8,
}

impl FrameSource for CountingSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
        let pixels = (self.width * self.height) as usize;
        let mut frame = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            frame.extend_from_slice(&[self.frame_no, 0, 0, 255]);
        }
        self.frame_no = self.frame_no.wrapping_add(1);
        Ok(frame)
    }
}

struct RecordingSink {
    record: Arc<Mutex<VideoRecord>>,
}

impl VideoSink for RecordingSink {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), CaptureError> {
        self.record.lock().frames.push(rgb.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CaptureError> {
        self.record.lock().finished = true;
        Ok(())
    }
}
