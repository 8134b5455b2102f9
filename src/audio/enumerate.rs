//! Device discovery via `cpal`.
//!
//! [`CpalEnumerator`] walks the devices of the default cpal host in the
//! order the host reports them.

use cpal::traits::{DeviceTrait, HostTrait};

use crate::settings::{DeviceDescriptor, DeviceDirection, DeviceEnumerator, DeviceError, DeviceHandle};

/// [`DeviceEnumerator`] over a cpal host.
pub struct CpalEnumerator {
    host: cpal::Host,
}

impl CpalEnumerator {
    /// Enumerator over the platform's default audio host.
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for CpalEnumerator {
    fn devices(&self, direction: DeviceDirection) -> Result<Vec<DeviceDescriptor>, DeviceError> {
        let devices = match direction {
            DeviceDirection::Input => self.host.input_devices(),
            DeviceDirection::Output => self.host.output_devices(),
        }
        .map_err(|e| DeviceError::Enumerate {
            direction: direction.label(),
            message: e.to_string(),
        })?;

        Ok(devices
            .enumerate()
            .map(|(i, device)| DeviceDescriptor {
                name: device_name(&device, i),
                handle: DeviceHandle::Cpal(device),
            })
            .collect())
    }
}

fn device_name(device: &cpal::Device, position: usize) -> String {
    device.name().unwrap_or_else(|e| {
        log::warn!("cpal device #{position} has no name: {e}");
        unknown_device_name(position)
    })
}

fn unknown_device_name(position: usize) -> String {
    format!("Unknown device #{position}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
