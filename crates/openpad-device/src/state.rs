//! Mirrored device state types and the change-flag bitmask.

use std::collections::BTreeMap;
use std::time::Instant;

use hid_pad_protocol::{
    BoardType, LedMappingReport, LightRuleReport, MAX_NAME_LENGTH, RgbColor, led_mapping_flags,
    light_rule_flags,
};
use serde::Serialize;

/// Bitmask of what changed during a tick, consumed by the presentation layer
/// to decide what to redraw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceChanges(u32);

impl DeviceChanges {
    pub const NONE: Self = Self(0);
    /// Device connected or disconnected.
    pub const DEVICE: Self = Self(1 << 0);
    pub const BUTTON_MAPPING: Self = Self(1 << 1);
    pub const NAME: Self = Self(1 << 2);
    pub const LIGHTS: Self = Self(1 << 3);
    pub const ADC: Self = Self(1 << 4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for DeviceChanges {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for DeviceChanges {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Immutable-after-connect identity plus the live release threshold.
#[derive(Debug, Clone, Serialize)]
pub struct PadState {
    pub name: String,
    pub max_name_length: usize,
    pub num_buttons: u8,
    pub num_sensors: u8,
    pub num_leds: u8,
    pub max_sensor_value: u16,
    /// Firmware (major, minor); (0, 0) for legacy devices.
    pub firmware_version: (u16, u16),
    pub board_type: BoardType,
    /// Shared release threshold ratio, `(0, 1]`.
    pub release_threshold: f64,
}

impl Default for PadState {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_name_length: MAX_NAME_LENGTH,
            num_buttons: 0,
            num_sensors: 0,
            num_leds: 0,
            max_sensor_value: 0,
            firmware_version: (0, 0),
            board_type: BoardType::Unknown,
            release_threshold: 1.0,
        }
    }
}

/// Live state of one sensor slot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SensorState {
    /// Normalized press threshold, `[0, 1]`.
    pub threshold: f64,
    /// Latest normalized reading, `[0, 1]`.
    pub value: f64,
    /// 1-based mapped button, 0 for unmapped.
    pub button: u8,
    /// True only while the button is mapped and the device reports it down.
    /// Hysteresis lives on-device; the host never re-derives this from
    /// `value`.
    pub pressed: bool,
}

/// Host view of one light rule table entry. Presence in the mirror implies
/// the enabled flag; disabled entries are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightRule {
    pub index: u8,
    pub fade_on: bool,
    pub fade_off: bool,
    pub on_color: RgbColor,
    pub off_color: RgbColor,
    pub on_fade_color: RgbColor,
    pub off_fade_color: RgbColor,
}

impl LightRule {
    pub(crate) fn from_report(report: &LightRuleReport) -> Self {
        Self {
            index: report.index,
            fade_on: report.flags & light_rule_flags::FADE_ON != 0,
            fade_off: report.flags & light_rule_flags::FADE_OFF != 0,
            on_color: report.on_color,
            off_color: report.off_color,
            on_fade_color: report.on_fade_color,
            off_fade_color: report.off_fade_color,
        }
    }

    pub(crate) fn to_report(self) -> LightRuleReport {
        let mut flags = light_rule_flags::ENABLED;
        if self.fade_on {
            flags |= light_rule_flags::FADE_ON;
        }
        if self.fade_off {
            flags |= light_rule_flags::FADE_OFF;
        }
        LightRuleReport {
            index: self.index,
            flags,
            on_color: self.on_color,
            off_color: self.off_color,
            on_fade_color: self.on_fade_color,
            off_fade_color: self.off_fade_color,
        }
    }
}

/// Host view of one LED mapping table entry. `light_rule_index` is a
/// back-reference into the rule table, not ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedMapping {
    pub index: u8,
    pub light_rule_index: u8,
    pub sensor_index: u8,
    pub led_index_begin: u8,
    pub led_index_end: u8,
}

impl LedMapping {
    pub(crate) fn from_report(report: &LedMappingReport) -> Self {
        Self {
            index: report.index,
            light_rule_index: report.light_rule_index,
            sensor_index: report.sensor_index,
            led_index_begin: report.led_index_begin,
            led_index_end: report.led_index_end,
        }
    }

    pub(crate) fn to_report(self) -> LedMappingReport {
        LedMappingReport {
            index: self.index,
            flags: led_mapping_flags::ENABLED,
            light_rule_index: self.light_rule_index,
            sensor_index: self.sensor_index,
            led_index_begin: self.led_index_begin,
            led_index_end: self.led_index_end,
        }
    }
}

/// The device stores rules and mappings as two flat tables addressed by
/// index; the mirror keeps the same flat shape and offers a grouped view for
/// display. The asymmetry is intentional: flat storage, relational view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LightsState {
    pub light_rules: BTreeMap<u8, LightRule>,
    pub led_mappings: BTreeMap<u8, LedMapping>,
}

impl LightsState {
    /// Mappings referencing the given rule, for the grouped display view.
    pub fn mappings_for_rule(&self, rule_index: u8) -> impl Iterator<Item = &LedMapping> {
        self.led_mappings
            .values()
            .filter(move |mapping| mapping.light_rule_index == rule_index)
    }
}

/// Per-sensor analog front-end configuration mirror.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AdcState {
    pub disabled: bool,
    pub set_resistor: bool,
    pub aref5: bool,
    pub aref3: bool,
    pub resistor_value: u8,
}

/// Rolling reports-per-second statistics. Not persisted.
#[derive(Debug, Clone, Copy)]
pub struct PollingData {
    pub reads_since_last_update: u32,
    pub polling_rate: u32,
    pub last_update: Instant,
}

impl PollingData {
    pub fn new(now: Instant) -> Self {
        Self {
            reads_since_last_update: 0,
            polling_rate: 0,
            last_update: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_bit_ops() {
        let mut changes = DeviceChanges::NONE;
        assert!(changes.is_empty());

        changes |= DeviceChanges::DEVICE;
        changes |= DeviceChanges::LIGHTS;
        assert!(changes.contains(DeviceChanges::DEVICE));
        assert!(changes.contains(DeviceChanges::LIGHTS));
        assert!(!changes.contains(DeviceChanges::NAME));
        assert_eq!(changes.bits(), 0b1001);
    }

    #[test]
    fn test_light_rule_report_round_trip() {
        let rule = LightRule {
            index: 4,
            fade_on: false,
            fade_off: true,
            on_color: RgbColor::new(100, 100, 100),
            off_color: RgbColor::new(0, 0, 2),
            on_fade_color: RgbColor::new(0, 0, 0),
            off_fade_color: RgbColor::new(0, 0, 255),
        };
        let report = rule.to_report();
        assert_eq!(report.flags, 0b101);
        assert_eq!(LightRule::from_report(&report), rule);
    }

    #[test]
    fn test_mappings_for_rule_groups_flat_table() {
        let mut lights = LightsState::default();
        for (index, rule) in [(0u8, 0u8), (1, 1), (2, 0), (3, 1)] {
            lights.led_mappings.insert(
                index,
                LedMapping {
                    index,
                    light_rule_index: rule,
                    sensor_index: index,
                    led_index_begin: 0,
                    led_index_end: 8,
                },
            );
        }

        let for_rule_1: Vec<u8> = lights.mappings_for_rule(1).map(|m| m.index).collect();
        assert_eq!(for_rule_1, vec![1, 3]);
    }
}
