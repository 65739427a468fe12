//! Per-sensor threshold/hysteresis state machine.
//!
//! A sensor presses when its raw magnitude reaches its press threshold and
//! releases only when the magnitude falls below the release level, which is
//! the press threshold scaled by the shared release ratio. The gap between
//! the two levels is what keeps a foot resting near the threshold from
//! chattering.

use hid_pad_protocol::{
    MAX_BUTTON_COUNT, MAX_SENSOR_COUNT, PadConfigurationReport, SensorValuesReport,
    UNMAPPED_BUTTON,
};

#[derive(Debug, Clone)]
pub struct PadSensors {
    thresholds: [u16; MAX_SENSOR_COUNT],
    release_levels: [u16; MAX_SENSOR_COUNT],
    mappings: [u8; MAX_SENSOR_COUNT],
    pressed: [bool; MAX_SENSOR_COUNT],
}

impl PadSensors {
    pub fn from_configuration(config: &PadConfigurationReport) -> Self {
        let mut sensors = Self {
            thresholds: config.sensor_thresholds,
            release_levels: [0; MAX_SENSOR_COUNT],
            mappings: config.sensor_to_button_mapping,
            pressed: [false; MAX_SENSOR_COUNT],
        };
        sensors.set_release_levels(config.release_threshold);
        sensors
    }

    /// Re-apply a configuration without losing current press state.
    pub fn update_configuration(&mut self, config: &PadConfigurationReport) {
        self.thresholds = config.sensor_thresholds;
        self.mappings = config.sensor_to_button_mapping;
        self.set_release_levels(config.release_threshold);
    }

    fn set_release_levels(&mut self, release_ratio: f32) {
        let ratio = f64::from(release_ratio).clamp(0.0, 1.0);
        for (level, threshold) in self.release_levels.iter_mut().zip(self.thresholds) {
            *level = (f64::from(threshold) * ratio).round() as u16;
        }
    }

    /// Fold one round of raw magnitudes into press state and return the
    /// button bitmask. Several sensors mapped to the same button OR together.
    pub fn update(&mut self, raw: &[u16; MAX_SENSOR_COUNT]) -> u16 {
        let mut bits: u16 = 0;
        for i in 0..MAX_SENSOR_COUNT {
            if self.pressed[i] {
                if raw[i] < self.release_levels[i] {
                    self.pressed[i] = false;
                }
            } else if raw[i] >= self.thresholds[i] && self.thresholds[i] > 0 {
                self.pressed[i] = true;
            }

            let mapping = self.mappings[i];
            if self.pressed[i] && mapping != UNMAPPED_BUTTON && usize::from(mapping) < MAX_BUTTON_COUNT
            {
                bits |= 1 << mapping;
            }
        }
        bits
    }

    /// Build the streamed input report for one round of magnitudes.
    pub fn input_report(&mut self, raw: &[u16; MAX_SENSOR_COUNT]) -> SensorValuesReport {
        SensorValuesReport {
            button_bits: self.update(raw),
            sensor_values: *raw,
        }
    }

    pub fn sensor_pressed(&self, sensor_index: usize) -> bool {
        self.pressed.get(sensor_index).copied().unwrap_or(false)
    }
}
