// Output devices - Lookup, stream config selection and connection status

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SampleRate, SupportedStreamConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::warn;

use crate::audio::AudioError;

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List every output device the host reports
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let mut devices = Vec::new();
        if let Ok(output_devices) = self.host.output_devices() {
            for device in output_devices {
                if let Ok(name) = device.name() {
                    devices.push(AudioDeviceInfo {
                        is_default: name == default_name,
                        name,
                    });
                }
            }
        }

        devices
    }

    /// Named device, or the host default when `name` is `None`
    pub fn output_device(&self, name: Option<&str>) -> Result<Device, AudioError> {
        match name {
            None => self.host.default_output_device().ok_or(AudioError::NoDevice),
            Some(wanted) => self
                .host
                .output_devices()?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string())),
        }
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a stereo config at `preferred_rate` if the device has one, otherwise
/// fall back to the device default.
pub fn choose_config(
    device: &Device,
    preferred_rate: u32,
) -> Result<SupportedStreamConfig, AudioError> {
    let exact = device.supported_output_configs()?.find(|range| {
        range.channels() >= 2
            && range.min_sample_rate().0 <= preferred_rate
            && preferred_rate <= range.max_sample_rate().0
    });

    if let Some(range) = exact {
        return Ok(range.with_sample_rate(SampleRate(preferred_rate)));
    }

    let fallback = device.default_output_config()?;
    warn!(
        preferred_rate,
        device_rate = fallback.sample_rate().0,
        "device cannot run at the configured rate, using its default"
    );
    Ok(fallback)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Error = 3,
}

impl From<u8> for DeviceStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => DeviceStatus::Connecting,
            2 => DeviceStatus::Connected,
            3 => DeviceStatus::Error,
            _ => DeviceStatus::Disconnected,
        }
    }
}

/// Status shared between the stream error callback and the control thread
#[derive(Clone)]
pub struct AtomicDeviceStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicDeviceStatus {
    pub fn new(status: DeviceStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> DeviceStatus {
        DeviceStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: DeviceStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicDeviceStatus {
    fn default() -> Self {
        Self::new(DeviceStatus::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_u8() {
        assert_eq!(DeviceStatus::from(2), DeviceStatus::Connected);
        assert_eq!(DeviceStatus::from(3), DeviceStatus::Error);
        assert_eq!(DeviceStatus::from(200), DeviceStatus::Disconnected);
    }

    #[test]
    fn test_atomic_status_shared() {
        let status = AtomicDeviceStatus::default();
        let callback_side = status.clone();
        assert_eq!(status.get(), DeviceStatus::Disconnected);

        callback_side.set(DeviceStatus::Error);
        assert_eq!(status.get(), DeviceStatus::Error);
    }
}
