//! cpal-backed implementation of the core audio traits.
//!
//! cpal delivers audio through callbacks on its own thread; the core
//! wants blocking block-granular reads. `CpalInputStream` bridges the
//! two with a bounded channel: the callback converts and pushes sample
//! chunks, `read_block` assembles them into 1024-frame blocks. When the
//! channel is full the callback drops samples instead of blocking,
//! which matches the non-throwing-on-overflow read contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Receiver};

use recorder_core::backend::audio::{block_len, AudioHost, AudioInputStream, StreamSpec};
use recorder_core::models::device::DeviceDescriptor;
use recorder_core::models::error::CaptureError;

/// Blocks of channel capacity between the cpal callback and the reader.
const CHANNEL_BLOCKS: usize = 64;

/// Bound on waiting for the hardware to deliver a block. A stream that
/// stays silent this long is treated as failed so the core's recovery
/// protocol can kick in.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

pub struct CpalHost {
    host: cpal::Host,
}

impl CpalHost {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn device_at(&self, index: u32) -> Result<cpal::Device, CaptureError> {
        self.host
            .devices()
            .map_err(|e| CaptureError::Stream(format!("device enumeration: {e}")))?
            .nth(index as usize)
            .ok_or(CaptureError::DeviceNotAvailable)
    }

    fn index_of(&self, target: &cpal::Device) -> Option<u32> {
        let target_name = target.name().ok()?;
        let devices = self.host.devices().ok()?;
        for (i, device) in devices.enumerate() {
            if device.name().ok().as_deref() == Some(target_name.as_str()) {
                return Some(i as u32);
            }
        }
        None
    }
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

fn max_channels<I>(configs: Option<I>) -> u16
where
    I: Iterator<Item = cpal::SupportedStreamConfigRange>,
{
    configs
        .map(|ranges| ranges.map(|r| r.channels()).max().unwrap_or(0))
        .unwrap_or(0)
}

impl AudioHost for CpalHost {
    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        let host_api = self.host.id().name().to_string();
        let devices = self
            .host
            .devices()
            .map_err(|e| CaptureError::Stream(format!("device enumeration: {e}")))?;

        let mut descriptors = Vec::new();
        for (index, device) in devices.enumerate() {
            let name = device.name().unwrap_or_else(|_| format!("device {index}"));
            let max_input_channels = max_channels(device.supported_input_configs().ok());
            let max_output_channels = max_channels(device.supported_output_configs().ok());
            let default_sample_rate = device
                .default_input_config()
                .or_else(|_| device.default_output_config())
                .map(|c| c.sample_rate().0)
                .unwrap_or(0);

            descriptors.push(DeviceDescriptor {
                index: index as u32,
                name,
                max_input_channels,
                max_output_channels,
                default_sample_rate,
                host_api: host_api.clone(),
            });
        }
        Ok(descriptors)
    }

    fn default_input(&self) -> Option<u32> {
        self.host
            .default_input_device()
            .and_then(|d| self.index_of(&d))
    }

    fn default_output(&self) -> Option<u32> {
        self.host
            .default_output_device()
            .and_then(|d| self.index_of(&d))
    }

    fn open_input(
        &self,
        device_index: u32,
        spec: StreamSpec,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError> {
        let device = self.device_at(device_index)?;
        let sample_format = device
            .default_input_config()
            .map_err(|e| CaptureError::Stream(format!("no input config: {e}")))?
            .sample_format();

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: SampleRate(spec.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let (tx, rx) = bounded::<Vec<i16>>(CHANNEL_BLOCKS);
        let failed = Arc::new(AtomicBool::new(false));
        let err_failed = Arc::clone(&failed);
        let err_fn = move |e: cpal::StreamError| {
            log::warn!("cpal stream error: {e}");
            err_failed.store(true, Ordering::SeqCst);
        };

        let stream = match sample_format {
            SampleFormat::I16 => device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        // Full channel means the reader is behind; drop.
                        let _ = tx.try_send(data.to_vec());
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| CaptureError::Stream(format!("build stream: {e}")))?,
            _ => device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let converted = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        let _ = tx.try_send(converted);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| CaptureError::Stream(format!("build stream: {e}")))?,
        };

        stream
            .play()
            .map_err(|e| CaptureError::Stream(format!("start stream: {e}")))?;

        Ok(Box::new(CpalInputStream {
            _stream: SendStream(stream),
            rx,
            pending: Vec::new(),
            channels: spec.channels,
            failed,
        }))
    }
}

/// cpal streams are not `Send`, but this one is created, used, and
/// dropped on the single capture thread that owns it; the wrapper only
/// satisfies the trait bound.
struct SendStream(cpal::Stream);
unsafe impl Send for SendStream {}

struct CpalInputStream {
    _stream: SendStream,
    rx: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    channels: u16,
    failed: Arc<AtomicBool>,
}

impl AudioInputStream for CpalInputStream {
    fn read_block(&mut self) -> Result<Vec<i16>, CaptureError> {
        let want = block_len(self.channels);
        while self.pending.len() < want {
            if self.failed.load(Ordering::SeqCst) {
                return Err(CaptureError::Stream("stream reported an error".into()));
            }
            let chunk = self
                .rx
                .recv_timeout(READ_TIMEOUT)
                .map_err(|_| CaptureError::Stream("read timed out".into()))?;
            self.pending.extend_from_slice(&chunk);
        }
        let rest = self.pending.split_off(want);
        Ok(std::mem::replace(&mut self.pending, rest))
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}
