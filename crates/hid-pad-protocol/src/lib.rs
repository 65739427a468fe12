//! Analog dance pad USB HID protocol.
//!
//! Report layouts and codec for FSR dance pad controllers. This crate
//! is intentionally I/O-free and allocation-free on hot paths: it provides
//! pure functions and fixed-layout report types that can be tested without
//! hardware or OS-level HID plumbing.
//!
//! All multi-byte fields are little-endian on the wire and are marshaled with
//! explicit byte composition — report payloads are never reinterpreted as
//! native structs, so host and device may differ in endianness and alignment.
//!
//! # Key features
//! - Fixed-size report encode/decode for every pad report kind
//! - Sensor magnitude normalization to and from `[0, 1]`
//! - Board type identification from the firmware's fixed-length tag
//! - Property IDs for the select-then-access indexed report convention

#![deny(static_mut_refs)]

pub mod codec;
pub mod error;
pub mod ids;
pub mod reports;
pub mod types;

pub use codec::{
    read_f32_le, read_u16_le, read_u32_le, to_device_sensor_value, to_normalized_sensor_value,
    write_f32_le, write_u16_le, write_u32_le,
};
pub use error::{ProtocolError, ProtocolResult};
pub use ids::{
    BOARD_TYPE_LENGTH, MAX_BUTTON_COUNT, MAX_LED_MAPPINGS, MAX_LIGHT_RULES, MAX_NAME_LENGTH,
    MAX_SENSOR_COUNT, MAX_SENSOR_VALUE, SUPPORTED_HID_IDS, property_ids, report_ids,
};
pub use reports::{
    AdcConfigReport, FactoryResetReport, IdentificationReport, LedMappingReport, LightRuleReport,
    NameReport, PadConfigurationReport, Report, ResetReport, SaveConfigurationReport,
    SensorValuesReport, SetPropertyReport,
};
pub use types::{
    BoardType, RgbColor, UNMAPPED_BUTTON, adc_config_flags, led_mapping_flags, light_rule_flags,
};
