//! Audio endpoints as seen by the settings layer.
//!
//! A [`Device`] is built once from a [`DeviceDescriptor`] returned by a
//! [`DeviceEnumerator`] and never changes afterwards.  The settings vault
//! owns the device lists; everything else holds `Arc<Device>`.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::ListItem;

// ---------------------------------------------------------------------------
// DeviceDirection
// ---------------------------------------------------------------------------

/// Which side of the audio path a device belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceDirection {
    /// Microphones and other capture endpoints.
    Input,
    /// Speakers, headphones and other playback endpoints.
    Output,
}

impl DeviceDirection {
    pub fn label(self) -> &'static str {
        match self {
            DeviceDirection::Input => "input",
            DeviceDirection::Output => "output",
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceHandle
// ---------------------------------------------------------------------------

/// Opaque reference to the backend object behind a [`Device`].
#[derive(Clone)]
pub enum DeviceHandle {
    /// A device discovered through the cpal host.
    Cpal(cpal::Device),
    /// A device with no backend object (fixed lists, tests).
    Detached,
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceHandle::Cpal(_) => f.write_str("Cpal(..)"),
            DeviceHandle::Detached => f.write_str("Detached"),
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceDescriptor / Device
// ---------------------------------------------------------------------------

/// What an enumerator reports for a single endpoint.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub name: String,
    pub handle: DeviceHandle,
}

impl DeviceDescriptor {
    /// Descriptor without a backend object.
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: DeviceHandle::Detached,
        }
    }
}

/// An enumerated audio endpoint.
#[derive(Debug)]
pub struct Device {
    name: String,
    index: usize,
    handle: DeviceHandle,
}

impl Device {
    /// Wraps a descriptor found at position `index` of the enumeration.
    pub fn new(descriptor: DeviceDescriptor, index: usize) -> Arc<Self> {
        Arc::new(Self {
            name: descriptor.name,
            index,
            handle: descriptor.handle,
        })
    }

    /// Display name as reported by the audio backend.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the enumeration this device came from.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// The cpal device, when this entry was discovered through cpal.
    pub fn cpal_device(&self) -> Option<&cpal::Device> {
        match &self.handle {
            DeviceHandle::Cpal(device) => Some(device),
            DeviceHandle::Detached => None,
        }
    }
}

impl ListItem for Device {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn key(&self) -> &str {
        &self.name
    }
}

/// Builds the list of devices in enumeration order.
pub fn build_device_list(descriptors: Vec<DeviceDescriptor>) -> Vec<Arc<Device>> {
    descriptors
        .into_iter()
        .enumerate()
        .map(|(index, descriptor)| Device::new(descriptor, index))
        .collect()
}

// ---------------------------------------------------------------------------
// DeviceEnumerator
// ---------------------------------------------------------------------------

/// Errors reported by a [`DeviceEnumerator`].
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to enumerate {direction} devices: {message}")]
    Enumerate {
        direction: &'static str,
        message: String,
    },
}

/// Source of the available audio endpoints.
pub trait DeviceEnumerator {
    /// Devices for `direction`, in the backend's enumeration order.
    fn devices(&self, direction: DeviceDirection) -> Result<Vec<DeviceDescriptor>, DeviceError>;
}

// ---------------------------------------------------------------------------
// StaticEnumerator
// ---------------------------------------------------------------------------

/// Enumerator over fixed name lists.  Used when device discovery is
/// disabled and as a test double.
#[derive(Debug, Clone, Default)]
pub struct StaticEnumerator {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl StaticEnumerator {
    pub fn new<I, O>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    /// An enumerator that reports no devices at all.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl DeviceEnumerator for StaticEnumerator {
    fn devices(&self, direction: DeviceDirection) -> Result<Vec<DeviceDescriptor>, DeviceError> {
        let names = match direction {
            DeviceDirection::Input => &self.inputs,
            DeviceDirection::Output => &self.outputs,
        };
        Ok(names.iter().map(DeviceDescriptor::detached).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
