//! Audio device discovery.
//!
//! [`CpalEnumerator`] is the production [`DeviceEnumerator`] used by the
//! settings controller.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voice_settings::audio::CpalEnumerator;
//! use voice_settings::settings::{DeviceDirection, DeviceEnumerator};
//!
//! let enumerator = CpalEnumerator::new();
//! for device in enumerator.devices(DeviceDirection::Output).unwrap() {
//!     println!("{}", device.name);
//! }
//! ```
//!
//! [`DeviceEnumerator`]: crate::settings::DeviceEnumerator

pub mod enumerate;

pub use enumerate::CpalEnumerator;
