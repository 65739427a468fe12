//! Fixed-layout report types and their codec.
//!
//! Each report kind is a plain value type plus an explicit little-endian
//! encode/decode pair. The transport layer frames every payload with the
//! report ID byte from [`crate::ids::report_ids`]; payloads themselves are
//! ID-free and exactly [`Report::PAYLOAD_LEN`] bytes.

use crate::codec::{read_f32_le, read_u16_le, read_u32_le, write_f32_le, write_u16_le, write_u32_le};
use crate::error::{ProtocolError, ProtocolResult};
use crate::ids::{
    BOARD_TYPE_LENGTH, MAX_BUTTON_COUNT, MAX_NAME_LENGTH, MAX_SENSOR_COUNT, MAX_SENSOR_VALUE,
    report_ids,
};
use crate::types::{BoardType, RgbColor, UNMAPPED_BUTTON};

/// A fixed-size wire report.
pub trait Report: Default {
    /// Transport report ID.
    const REPORT_ID: u8;
    /// Exact payload size in bytes, excluding the report ID byte.
    const PAYLOAD_LEN: usize;

    /// Decode a payload of exactly [`Self::PAYLOAD_LEN`] bytes.
    fn decode(payload: &[u8]) -> ProtocolResult<Self>;

    /// Encode into a payload buffer of exactly [`Self::PAYLOAD_LEN`] bytes.
    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()>;
}

fn check_len(expected: usize, actual: usize) -> ProtocolResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProtocolError::InvalidLength { expected, actual })
    }
}

fn read_rgb(payload: &[u8], offset: usize) -> RgbColor {
    RgbColor {
        red: payload[offset],
        green: payload[offset + 1],
        blue: payload[offset + 2],
    }
}

fn write_rgb(payload: &mut [u8], offset: usize, color: RgbColor) {
    payload[offset] = color.red;
    payload[offset + 1] = color.green;
    payload[offset + 2] = color.blue;
}

// ===================================================================================================================
// Input stream.
// ===================================================================================================================

/// Streamed sensor sample: pressed-button bitmask plus one raw magnitude per
/// sensor slot.
///
/// Layout:
/// - Bytes 0-1: button bitmask (bit `n` = 1-based button `n + 1`)
/// - Bytes 2-25: 12 × raw magnitude (16-bit, `0..=MAX_SENSOR_VALUE`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorValuesReport {
    pub button_bits: u16,
    pub sensor_values: [u16; MAX_SENSOR_COUNT],
}

impl Report for SensorValuesReport {
    const REPORT_ID: u8 = report_ids::SENSOR_VALUES;
    const PAYLOAD_LEN: usize = 2 + MAX_SENSOR_COUNT * 2;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        let mut report = Self {
            button_bits: read_u16_le([payload[0], payload[1]]),
            ..Self::default()
        };
        for (i, value) in report.sensor_values.iter_mut().enumerate() {
            let at = 2 + i * 2;
            *value = read_u16_le([payload[at], payload[at + 1]]);
        }
        Ok(report)
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        payload[0..2].copy_from_slice(&write_u16_le(self.button_bits));
        for (i, value) in self.sensor_values.iter().enumerate() {
            let at = 2 + i * 2;
            payload[at..at + 2].copy_from_slice(&write_u16_le(*value));
        }
        Ok(())
    }
}

// ===================================================================================================================
// Configuration.
// ===================================================================================================================

/// Per-sensor thresholds and button mappings plus the shared release
/// threshold.
///
/// Layout:
/// - Bytes 0-23: 12 × press threshold (16-bit raw magnitude)
/// - Bytes 24-35: 12 × button mapping (0-based, `0xFF` = unmapped)
/// - Bytes 36-39: release threshold ratio (f32, `(0, 1]`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadConfigurationReport {
    pub sensor_thresholds: [u16; MAX_SENSOR_COUNT],
    pub sensor_to_button_mapping: [u8; MAX_SENSOR_COUNT],
    pub release_threshold: f32,
}

impl Default for PadConfigurationReport {
    fn default() -> Self {
        Self {
            sensor_thresholds: [MAX_SENSOR_VALUE; MAX_SENSOR_COUNT],
            sensor_to_button_mapping: [UNMAPPED_BUTTON; MAX_SENSOR_COUNT],
            release_threshold: 1.0,
        }
    }
}

impl Report for PadConfigurationReport {
    const REPORT_ID: u8 = report_ids::PAD_CONFIGURATION;
    const PAYLOAD_LEN: usize = MAX_SENSOR_COUNT * 2 + MAX_SENSOR_COUNT + 4;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        let mut report = Self::default();
        for (i, threshold) in report.sensor_thresholds.iter_mut().enumerate() {
            let at = i * 2;
            *threshold = read_u16_le([payload[at], payload[at + 1]]);
        }
        let mappings_at = MAX_SENSOR_COUNT * 2;
        report
            .sensor_to_button_mapping
            .copy_from_slice(&payload[mappings_at..mappings_at + MAX_SENSOR_COUNT]);
        let release_at = mappings_at + MAX_SENSOR_COUNT;
        report.release_threshold = read_f32_le([
            payload[release_at],
            payload[release_at + 1],
            payload[release_at + 2],
            payload[release_at + 3],
        ]);
        Ok(report)
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        for (i, threshold) in self.sensor_thresholds.iter().enumerate() {
            let at = i * 2;
            payload[at..at + 2].copy_from_slice(&write_u16_le(*threshold));
        }
        let mappings_at = MAX_SENSOR_COUNT * 2;
        payload[mappings_at..mappings_at + MAX_SENSOR_COUNT]
            .copy_from_slice(&self.sensor_to_button_mapping);
        let release_at = mappings_at + MAX_SENSOR_COUNT;
        payload[release_at..release_at + 4].copy_from_slice(&write_f32_le(self.release_threshold));
        Ok(())
    }
}

/// Pad display name: declared length plus a fixed-capacity byte buffer.
///
/// Layout:
/// - Byte 0: used length
/// - Bytes 1-50: name bytes (single-byte text, ASCII-safe)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameReport {
    pub size: u8,
    pub name: [u8; MAX_NAME_LENGTH],
}

impl Default for NameReport {
    fn default() -> Self {
        Self {
            size: 0,
            name: [0; MAX_NAME_LENGTH],
        }
    }
}

impl NameReport {
    /// Decode the used portion of the buffer as text.
    pub fn text(&self) -> String {
        let len = usize::from(self.size).min(MAX_NAME_LENGTH);
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }

    /// Set the buffer from a string, rejecting anything over capacity.
    pub fn set_text(&mut self, text: &str) -> ProtocolResult<()> {
        let bytes = text.as_bytes();
        if bytes.len() > MAX_NAME_LENGTH {
            return Err(ProtocolError::NameTooLong {
                max: MAX_NAME_LENGTH,
                actual: bytes.len(),
            });
        }
        self.name = [0; MAX_NAME_LENGTH];
        self.name[..bytes.len()].copy_from_slice(bytes);
        self.size = bytes.len() as u8;
        Ok(())
    }
}

impl Report for NameReport {
    const REPORT_ID: u8 = report_ids::NAME;
    const PAYLOAD_LEN: usize = 1 + MAX_NAME_LENGTH;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        let mut report = Self {
            size: payload[0],
            ..Self::default()
        };
        report.name.copy_from_slice(&payload[1..1 + MAX_NAME_LENGTH]);
        Ok(report)
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        payload[0] = self.size;
        payload[1..1 + MAX_NAME_LENGTH].copy_from_slice(&self.name);
        Ok(())
    }
}

/// Firmware identity and declared capabilities.
///
/// Layout:
/// - Bytes 0-1: firmware major version (16-bit)
/// - Bytes 2-3: firmware minor version (16-bit)
/// - Byte 4: button count
/// - Byte 5: sensor count
/// - Byte 6: LED count
/// - Bytes 7-8: max raw sensor magnitude (16-bit)
/// - Bytes 9-40: board type tag (fixed length, not NUL-terminated)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentificationReport {
    pub firmware_major: u16,
    pub firmware_minor: u16,
    pub button_count: u8,
    pub sensor_count: u8,
    pub led_count: u8,
    pub max_sensor_value: u16,
    pub board_type: [u8; BOARD_TYPE_LENGTH],
}

impl Default for IdentificationReport {
    fn default() -> Self {
        Self {
            firmware_major: 0,
            firmware_minor: 0,
            button_count: 0,
            sensor_count: 0,
            led_count: 0,
            max_sensor_value: 0,
            board_type: [0; BOARD_TYPE_LENGTH],
        }
    }
}

impl IdentificationReport {
    /// Synthetic identity substituted for legacy firmware that does not
    /// answer the identification probe.
    pub fn legacy_defaults() -> Self {
        let mut report = Self {
            firmware_major: 0,
            firmware_minor: 0,
            button_count: MAX_BUTTON_COUNT as u8,
            sensor_count: MAX_SENSOR_COUNT as u8,
            led_count: 0,
            max_sensor_value: MAX_SENSOR_VALUE,
            board_type: [0; BOARD_TYPE_LENGTH],
        };
        let tag = BoardType::Unknown.tag().as_bytes();
        report.board_type[..tag.len()].copy_from_slice(tag);
        report
    }

    /// Parse the fixed-length board tag.
    pub fn parsed_board_type(&self) -> BoardType {
        BoardType::parse(&self.board_type)
    }
}

impl Report for IdentificationReport {
    const REPORT_ID: u8 = report_ids::IDENTIFICATION;
    const PAYLOAD_LEN: usize = 9 + BOARD_TYPE_LENGTH;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        let mut report = Self {
            firmware_major: read_u16_le([payload[0], payload[1]]),
            firmware_minor: read_u16_le([payload[2], payload[3]]),
            button_count: payload[4],
            sensor_count: payload[5],
            led_count: payload[6],
            max_sensor_value: read_u16_le([payload[7], payload[8]]),
            ..Self::default()
        };
        report.board_type.copy_from_slice(&payload[9..9 + BOARD_TYPE_LENGTH]);
        Ok(report)
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        payload[0..2].copy_from_slice(&write_u16_le(self.firmware_major));
        payload[2..4].copy_from_slice(&write_u16_le(self.firmware_minor));
        payload[4] = self.button_count;
        payload[5] = self.sensor_count;
        payload[6] = self.led_count;
        payload[7..9].copy_from_slice(&write_u16_le(self.max_sensor_value));
        payload[9..9 + BOARD_TYPE_LENGTH].copy_from_slice(&self.board_type);
        Ok(())
    }
}

// ===================================================================================================================
// Lights.
// ===================================================================================================================

/// One entry of the device's flat light rule table.
///
/// Layout: index, flags (bit 0 enabled, bit 1 fade-on, bit 2 fade-off), then
/// four RGB colors: on, off, on-fade, off-fade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightRuleReport {
    pub index: u8,
    pub flags: u8,
    pub on_color: RgbColor,
    pub off_color: RgbColor,
    pub on_fade_color: RgbColor,
    pub off_fade_color: RgbColor,
}

impl Report for LightRuleReport {
    const REPORT_ID: u8 = report_ids::LIGHT_RULE;
    const PAYLOAD_LEN: usize = 2 + 4 * 3;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        Ok(Self {
            index: payload[0],
            flags: payload[1],
            on_color: read_rgb(payload, 2),
            off_color: read_rgb(payload, 5),
            on_fade_color: read_rgb(payload, 8),
            off_fade_color: read_rgb(payload, 11),
        })
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        payload[0] = self.index;
        payload[1] = self.flags;
        write_rgb(payload, 2, self.on_color);
        write_rgb(payload, 5, self.off_color);
        write_rgb(payload, 8, self.on_fade_color);
        write_rgb(payload, 11, self.off_fade_color);
        Ok(())
    }
}

/// One entry of the device's flat LED mapping table: which light rule drives
/// which contiguous LED range, watching which sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedMappingReport {
    pub index: u8,
    pub flags: u8,
    pub light_rule_index: u8,
    pub sensor_index: u8,
    pub led_index_begin: u8,
    pub led_index_end: u8,
}

impl Report for LedMappingReport {
    const REPORT_ID: u8 = report_ids::LED_MAPPING;
    const PAYLOAD_LEN: usize = 6;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        Ok(Self {
            index: payload[0],
            flags: payload[1],
            light_rule_index: payload[2],
            sensor_index: payload[3],
            led_index_begin: payload[4],
            led_index_end: payload[5],
        })
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        payload[0] = self.index;
        payload[1] = self.flags;
        payload[2] = self.light_rule_index;
        payload[3] = self.sensor_index;
        payload[4] = self.led_index_begin;
        payload[5] = self.led_index_end;
        Ok(())
    }
}

// ===================================================================================================================
// Side channel and per-sensor ADC configuration.
// ===================================================================================================================

/// Property write used as the index-selection side channel for the flat
/// tables. Selection has no acknowledgement; it relies on in-order report
/// processing on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetPropertyReport {
    pub property_id: u32,
    pub property_value: u32,
}

impl SetPropertyReport {
    pub fn select(property_id: u32, property_value: u32) -> Self {
        Self {
            property_id,
            property_value,
        }
    }
}

impl Report for SetPropertyReport {
    const REPORT_ID: u8 = report_ids::SET_PROPERTY;
    const PAYLOAD_LEN: usize = 8;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        Ok(Self {
            property_id: read_u32_le([payload[0], payload[1], payload[2], payload[3]]),
            property_value: read_u32_le([payload[4], payload[5], payload[6], payload[7]]),
        })
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        payload[0..4].copy_from_slice(&write_u32_le(self.property_id));
        payload[4..8].copy_from_slice(&write_u32_le(self.property_value));
        Ok(())
    }
}

/// Per-sensor analog front-end configuration (reference selection, digipot
/// resistor value). Addressed by the embedded index on writes and by
/// `SELECTED_SENSOR_INDEX` on reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdcConfigReport {
    pub index: u8,
    pub flags: u8,
    pub resistor_value: u8,
}

impl Report for AdcConfigReport {
    const REPORT_ID: u8 = report_ids::ADC_CONFIG;
    const PAYLOAD_LEN: usize = 3;

    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        Ok(Self {
            index: payload[0],
            flags: payload[1],
            resistor_value: payload[2],
        })
    }

    fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
        check_len(Self::PAYLOAD_LEN, payload.len())?;
        payload[0] = self.index;
        payload[1] = self.flags;
        payload[2] = self.resistor_value;
        Ok(())
    }
}

// ===================================================================================================================
// Commands.
// ===================================================================================================================

macro_rules! command_report {
    ($(#[$doc:meta])* $name:ident, $id:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Report for $name {
            const REPORT_ID: u8 = $id;
            const PAYLOAD_LEN: usize = 0;

            fn decode(payload: &[u8]) -> ProtocolResult<Self> {
                check_len(Self::PAYLOAD_LEN, payload.len())?;
                Ok(Self)
            }

            fn encode(&self, payload: &mut [u8]) -> ProtocolResult<()> {
                check_len(Self::PAYLOAD_LEN, payload.len())
            }
        }
    };
}

command_report!(
    /// Reboot the device (into the bootloader where supported).
    ResetReport,
    report_ids::RESET
);
command_report!(
    /// Persist the device's live configuration to its block store.
    SaveConfigurationReport,
    report_ids::SAVE_CONFIGURATION
);
command_report!(
    /// Load and persist firmware defaults.
    FactoryResetReport,
    report_ids::FACTORY_RESET
);
