//! HID transport boundary for OpenPad.
//!
//! The device core only ever sees the shapes in this crate: a byte-report
//! request/response channel addressed by report ID, and an enumerate/open
//! backend. The `hidapi` implementation lives behind the same traits as the
//! scripted mock used by tests, so everything above this crate runs unchanged
//! against either.

pub mod device_info;
pub mod hid_traits;
pub mod hidapi_backend;

pub use device_info::HidDeviceInfo;
pub use hid_traits::{HidBackend, PadTransport, ReadOutcome, mock};
pub use hidapi_backend::HidapiBackend;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidCommonError {
    #[error("HID backend initialization failed: {0}")]
    Init(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenError(String),

    #[error("Failed to read from device: {0}")]
    ReadError(String),

    #[error("Failed to write to device: {0}")]
    WriteError(String),

    #[error("Device disconnected")]
    Disconnected,
}

pub type HidCommonResult<T> = Result<T, HidCommonError>;
