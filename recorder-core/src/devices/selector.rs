//! Working-device auto-selection.
//!
//! Stateless query: each call re-enumerates and re-probes. Callers that
//! need a consistent view across a session cache the result themselves.

use crate::backend::audio::{AudioHost, StreamSpec};
use crate::devices::catalog::{self, DeviceCatalog};
use crate::models::device::DeviceDescriptor;

/// Result of one auto-selection pass. Absence of a device is not an
/// error; a missing entry simply means nothing usable was found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub mic: Option<DeviceDescriptor>,
    pub speaker: Option<DeviceDescriptor>,
}

const PROBE_SPEC: StreamSpec = StreamSpec {
    sample_rate: 44100,
    channels: 1,
};

/// Open and immediately drop a mono stream to verify the device works
/// as a capture endpoint.
fn trial_open(host: &dyn AudioHost, index: u32) -> bool {
    match host.open_input(index, PROBE_SPEC) {
        Ok(stream) => {
            drop(stream);
            true
        }
        Err(e) => {
            log::debug!("device {index} failed trial open: {e}");
            false
        }
    }
}

fn find_by_index(devices: &[DeviceDescriptor], index: u32) -> Option<DeviceDescriptor> {
    devices.iter().find(|d| d.index == index).cloned()
}

/// Resolve a working microphone: OS default first, then priority-ranked
/// candidates, each verified by a trial open. Absolute fallback is the
/// first enumerated capture device, unverified.
fn select_mic(host: &dyn AudioHost, catalog: &DeviceCatalog) -> Option<DeviceDescriptor> {
    if let Some(index) = host.default_input() {
        if trial_open(host, index) {
            if let Some(device) = find_by_index(&catalog.microphones, index) {
                log::info!("default microphone selected: {}", device.name);
                return Some(device);
            }
        } else {
            log::warn!("default microphone (index {index}) failed trial open");
        }
    }

    for device in catalog::rank(&catalog.microphones) {
        if trial_open(host, device.index) {
            log::info!("microphone selected by ranked scan: {}", device.name);
            return Some(device);
        }
    }

    catalog.microphones.first().map(|device| {
        log::warn!(
            "no verified microphone; falling back to first enumerated device unverified: {}",
            device.name
        );
        device.clone()
    })
}

/// Resolve a speaker-loopback device. Virtual/loopback endpoints are
/// probed before the ranked remainder: they are the only reliable
/// system-audio capture path on consumer OSes, despite scoring lowest
/// for microphone selection.
fn select_speaker(host: &dyn AudioHost, catalog: &DeviceCatalog) -> Option<DeviceDescriptor> {
    if let Some(index) = host.default_output() {
        if trial_open(host, index) {
            if let Some(device) = find_by_index(&catalog.speakers, index) {
                log::info!("default output selected for loopback: {}", device.name);
                return Some(device);
            }
        } else {
            log::warn!("default output (index {index}) failed loopback trial open");
        }
    }

    let (loopback, rest): (Vec<_>, Vec<_>) = catalog
        .speakers
        .iter()
        .cloned()
        .partition(|d| catalog::classify(&d.name).is_virtual);

    for device in loopback.iter().chain(catalog::rank(&rest).iter()) {
        if trial_open(host, device.index) {
            log::info!("speaker loopback selected: {}", device.name);
            return Some(device.clone());
        }
    }

    catalog.speakers.first().map(|device| {
        log::warn!(
            "no verified speaker loopback; falling back to first enumerated device unverified: {}",
            device.name
        );
        device.clone()
    })
}

/// One auto-selection pass over the current hardware snapshot.
///
/// Evaluated eagerly, top to bottom, with each stage returning an
/// optional result. Never fails: enumeration errors yield an empty
/// selection with a logged error.
pub fn auto_select(host: &dyn AudioHost) -> Selection {
    let catalog = match catalog::enumerate(host) {
        Ok(c) => c,
        Err(e) => {
            log::error!("device enumeration failed: {e}");
            return Selection::default();
        }
    };

    Selection {
        mic: select_mic(host, &catalog),
        speaker: select_speaker(host, &catalog),
    }
}
