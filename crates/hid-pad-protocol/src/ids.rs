//! Protocol constants: report IDs, property IDs, capacity limits and the
//! vendor/product allowlist for compatible pads.
//!
//! The capacity limits mirror the firmware's compile-time configuration. The
//! device may declare smaller live counts through its identification report;
//! wire arrays are always sized to the maxima.

/// Full-scale raw sensor magnitude as reported by the firmware ADC path.
pub const MAX_SENSOR_VALUE: u16 = 1024;

/// Number of buttons representable in the report button bitmask.
pub const MAX_BUTTON_COUNT: usize = 16;

/// Number of sensor slots carried in every sensor-indexed wire array.
pub const MAX_SENSOR_COUNT: usize = 12;

/// Light rule table capacity on the device.
pub const MAX_LIGHT_RULES: usize = 16;

/// LED mapping table capacity on the device.
pub const MAX_LED_MAPPINGS: usize = 16;

/// Maximum pad name length in bytes.
pub const MAX_NAME_LENGTH: usize = 50;

/// Fixed length of the board type tag in the identification report.
/// The tag is not NUL-terminated on the wire.
pub const BOARD_TYPE_LENGTH: usize = 32;

/// Vendor/product ID pairs of compatible pad hardware. Devices outside this
/// list are never opened.
pub const SUPPORTED_HID_IDS: [(u16, u16); 2] = [(0x1209, 0xb196), (0x03eb, 0x204f)];

/// HID report IDs. The ID byte travels in the transport framing, ahead of the
/// fixed-size payload described by each report type.
pub mod report_ids {
    pub const SENSOR_VALUES: u8 = 0x01;
    pub const PAD_CONFIGURATION: u8 = 0x02;
    pub const RESET: u8 = 0x03;
    pub const SAVE_CONFIGURATION: u8 = 0x04;
    pub const NAME: u8 = 0x05;
    pub const LIGHT_RULE: u8 = 0x06;
    pub const LED_MAPPING: u8 = 0x07;
    pub const SET_PROPERTY: u8 = 0x08;
    pub const FACTORY_RESET: u8 = 0x09;
    pub const IDENTIFICATION: u8 = 0x0A;
    pub const ADC_CONFIG: u8 = 0x0B;
}

/// Property IDs for the [`SetProperty`](crate::SetPropertyReport) side
/// channel. Selecting an index makes the next get/set of the matching
/// indexed report operate on that element.
pub mod property_ids {
    pub const SELECTED_LIGHT_RULE_INDEX: u32 = 0;
    pub const SELECTED_LED_MAPPING_INDEX: u32 = 1;
    pub const SELECTED_SENSOR_INDEX: u32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_ids_are_distinct() {
        let ids = [
            report_ids::SENSOR_VALUES,
            report_ids::PAD_CONFIGURATION,
            report_ids::RESET,
            report_ids::SAVE_CONFIGURATION,
            report_ids::NAME,
            report_ids::LIGHT_RULE,
            report_ids::LED_MAPPING,
            report_ids::SET_PROPERTY,
            report_ids::FACTORY_RESET,
            report_ids::IDENTIFICATION,
            report_ids::ADC_CONFIG,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_allowlist_contains_primary_pid() {
        assert!(SUPPORTED_HID_IDS.contains(&(0x1209, 0xb196)));
    }
}
