//! Device-side pad logic, hardware-free.
//!
//! This crate carries the firmware's share of the protocol contract as pure
//! logic over trait seams: the per-sensor threshold/hysteresis state machine
//! that turns raw ADC magnitudes into the button bitmask, light rule
//! evaluation into an LED color frame, the magic-byte-guarded configuration
//! store, and the report dispatch that maps wire reports onto the live
//! configuration. ADC sampling, EEPROM cells, LED output and the USB stack
//! are external services supplied by the embedding firmware; a host-side
//! embedding can drive the same logic for loopback testing.

pub mod config_store;
pub mod dispatch;
pub mod lights;
pub mod pad;

pub use config_store::{ConfigStore, FirmwareConfig, MemoryStorage, Storage, StorageError};
pub use dispatch::{FirmwarePad, ResetAction};
pub use lights::render_frame;
pub use pad::PadSensors;

use thiserror::Error;

/// Firmware version embedded in the identification report and the config
/// store magic bytes. Bumping it invalidates stored configurations.
pub const FIRMWARE_VERSION_MAJOR: u8 = 1;
pub const FIRMWARE_VERSION_MINOR: u8 = 3;

#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("Unknown report id: 0x{0:02X}")]
    UnknownReport(u8),

    #[error(transparent)]
    Protocol(#[from] hid_pad_protocol::ProtocolError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type FirmwareResult<T> = Result<T, FirmwareError>;
