//! Host-side mirror of one connected pad.
//!
//! The device is the source of truth: every mutating operation sends the
//! intended state, then reads the device's echo back and resyncs the mirror
//! from it. A partial failure is reported as overall failure even though some
//! legs may have taken effect on-device; the mirror still follows whatever
//! could be read back.

use std::time::{Duration, Instant};

use hid_pad_protocol::{
    AdcConfigReport, IdentificationReport, LedMappingReport, LightRuleReport, MAX_BUTTON_COUNT,
    MAX_SENSOR_COUNT, NameReport, PadConfigurationReport, SensorValuesReport, SetPropertyReport,
    UNMAPPED_BUTTON, adc_config_flags, led_mapping_flags, light_rule_flags, property_ids,
    to_device_sensor_value, to_normalized_sensor_value,
};

use crate::reporter::{ReadResult, Reporter};
use crate::state::{
    AdcState, DeviceChanges, LedMapping, LightRule, LightsState, PadState, PollingData, SensorState,
};

/// Upper bound on buffered sensor reports drained per tick.
const MAX_READS_PER_UPDATE: u32 = 100;

/// Polling-rate recompute interval.
const POLLING_WINDOW: Duration = Duration::from_secs(1);

pub struct PadDevice {
    reporter: Reporter,
    path: String,
    pad: PadState,
    lights: LightsState,
    sensors: [SensorState; MAX_SENSOR_COUNT],
    adcs: [AdcState; MAX_SENSOR_COUNT],
    changes: DeviceChanges,
    has_unsaved_changes: bool,
    polling: PollingData,
}

impl PadDevice {
    #[allow(clippy::too_many_arguments, reason = "construction happens once, from probe results")]
    pub(crate) fn new(
        reporter: Reporter,
        path: &str,
        name: &NameReport,
        config: &PadConfigurationReport,
        identification: &IdentificationReport,
        light_rules: &[LightRuleReport],
        led_mappings: &[LedMappingReport],
        now: Instant,
    ) -> Self {
        let mut device = Self {
            reporter,
            path: path.to_owned(),
            pad: PadState {
                num_buttons: identification.button_count,
                num_sensors: identification.sensor_count.min(MAX_SENSOR_COUNT as u8),
                num_leds: identification.led_count,
                max_sensor_value: identification.max_sensor_value,
                firmware_version: (identification.firmware_major, identification.firmware_minor),
                board_type: identification.parsed_board_type(),
                ..PadState::default()
            },
            lights: LightsState::default(),
            sensors: [SensorState::default(); MAX_SENSOR_COUNT],
            adcs: [AdcState::default(); MAX_SENSOR_COUNT],
            changes: DeviceChanges::NONE,
            has_unsaved_changes: false,
            polling: PollingData::new(now),
        };

        device.apply_name(name);
        device.apply_pad_configuration(config);
        for rule in light_rules {
            device.apply_light_rule(rule);
        }
        for mapping in led_mappings {
            device.apply_led_mapping(mapping);
        }
        device
    }

    fn apply_name(&mut self, report: &NameReport) {
        self.pad.name = report.text();
        self.changes |= DeviceChanges::NAME;
    }

    fn apply_pad_configuration(&mut self, report: &PadConfigurationReport) {
        for i in 0..usize::from(self.pad.num_sensors) {
            let mapping = report.sensor_to_button_mapping[i];
            self.sensors[i].threshold =
                to_normalized_sensor_value(f64::from(report.sensor_thresholds[i]));
            self.sensors[i].button = if mapping >= self.pad.num_buttons {
                0
            } else {
                mapping + 1
            };
        }
        self.pad.release_threshold = f64::from(report.release_threshold);
    }

    fn apply_light_rule(&mut self, report: &LightRuleReport) {
        if report.flags & light_rule_flags::ENABLED != 0 {
            self.lights
                .light_rules
                .insert(report.index, LightRule::from_report(report));
        } else {
            self.lights.light_rules.remove(&report.index);
        }
    }

    fn apply_led_mapping(&mut self, report: &LedMappingReport) {
        if report.flags & led_mapping_flags::ENABLED != 0 {
            self.lights
                .led_mappings
                .insert(report.index, LedMapping::from_report(report));
        } else {
            self.lights.led_mappings.remove(&report.index);
        }
    }

    fn apply_adc_config(&mut self, report: &AdcConfigReport) {
        let index = usize::from(report.index);
        if index < usize::from(self.pad.num_sensors) {
            self.adcs[index] = AdcState {
                disabled: report.flags & adc_config_flags::DISABLED != 0,
                set_resistor: report.flags & adc_config_flags::SET_RESISTOR != 0,
                aref5: report.flags & adc_config_flags::AREF_5V != 0,
                aref3: report.flags & adc_config_flags::AREF_3V != 0,
                resistor_value: report.resistor_value,
            };
        }
    }

    /// Drain buffered sensor reports and fold them into the mirror.
    ///
    /// Reads at most [`MAX_READS_PER_UPDATE`] reports, stopping early when
    /// the stream runs dry. Magnitudes are averaged across the burst while
    /// button bits are OR-ed, so a momentary press inside the burst survives
    /// the smoothing. Returns false on a transport failure; the caller must
    /// treat that as a disconnect.
    pub fn update_sensor_values(&mut self, now: Instant) -> bool {
        let mut aggregate = [0u64; MAX_SENSOR_COUNT];
        let mut pressed_buttons: u16 = 0;
        let mut inputs_read: u32 = 0;

        for _ in 0..MAX_READS_PER_UPDATE {
            match self.reporter.get::<SensorValuesReport>() {
                ReadResult::Success(report) => {
                    pressed_buttons |= report.button_bits;
                    for (total, value) in aggregate.iter_mut().zip(report.sensor_values) {
                        *total += u64::from(value);
                    }
                    inputs_read += 1;
                }
                ReadResult::NoData => break,
                ReadResult::Failure => return false,
            }
        }

        if inputs_read > 0 {
            for i in 0..usize::from(self.pad.num_sensors) {
                let button = self.sensors[i].button;
                let value = aggregate[i] as f64 / f64::from(inputs_read);
                self.sensors[i].pressed = button > 0
                    && usize::from(button - 1) < MAX_BUTTON_COUNT
                    && pressed_buttons & (1u16 << (button - 1)) != 0;
                self.sensors[i].value = to_normalized_sensor_value(value);
            }
            self.polling.reads_since_last_update += inputs_read;
        }

        let elapsed = now.saturating_duration_since(self.polling.last_update);
        if elapsed >= POLLING_WINDOW {
            let rate = f64::from(self.polling.reads_since_last_update) / elapsed.as_secs_f64();
            self.polling.polling_rate = rate.round() as u32;
            self.polling.reads_since_last_update = 0;
            self.polling.last_update = now;
        }

        true
    }

    pub fn set_threshold(&mut self, sensor_index: usize, threshold: f64) -> bool {
        if sensor_index >= usize::from(self.pad.num_sensors) {
            return false;
        }
        self.sensors[sensor_index].threshold = threshold.clamp(0.0, 1.0);
        self.send_pad_configuration()
    }

    pub fn set_release_threshold(&mut self, threshold: f64) -> bool {
        self.pad.release_threshold = threshold.clamp(0.01, 1.0);
        self.send_pad_configuration()
    }

    /// Map a sensor to a 1-based button, or 0 to unmap.
    pub fn set_button_mapping(&mut self, sensor_index: usize, button: u8) -> bool {
        if sensor_index >= usize::from(self.pad.num_sensors) {
            return false;
        }
        self.sensors[sensor_index].button = button;
        self.changes |= DeviceChanges::BUTTON_MAPPING;
        self.send_pad_configuration()
    }

    /// Push the mirror's thresholds and mappings to the device and resync
    /// from its echo.
    pub fn send_pad_configuration(&mut self) -> bool {
        let mut report = PadConfigurationReport::default();
        for i in 0..usize::from(self.pad.num_sensors) {
            report.sensor_thresholds[i] = to_device_sensor_value(self.sensors[i].threshold);
            report.sensor_to_button_mapping[i] = match self.sensors[i].button {
                0 => UNMAPPED_BUTTON,
                button => button - 1,
            };
        }
        report.release_threshold = self.pad.release_threshold as f32;

        let send_result = self.reporter.send(&report);
        let get_result = self.reporter.get::<PadConfigurationReport>();

        self.has_unsaved_changes = true;
        match &get_result {
            ReadResult::Success(echo) => self.apply_pad_configuration(echo),
            // Nothing read back; the mirror keeps the intended values.
            _ => self.apply_pad_configuration(&report),
        }
        send_result && get_result.is_success()
    }

    pub fn send_name(&mut self, name: &str) -> bool {
        let mut report = NameReport::default();
        if let Err(error) = report.set_text(name) {
            tracing::warn!(%error, "name not set");
            return false;
        }

        let result = self.reporter.send(&report) && {
            match self.reporter.get::<NameReport>() {
                ReadResult::Success(echo) => {
                    report = echo;
                    true
                }
                _ => false,
            }
        };
        self.has_unsaved_changes = true;
        self.apply_name(&report);
        result
    }

    pub fn send_light_rule(&mut self, rule: &LightRule) -> bool {
        let report = rule.to_report();
        self.indexed_light_write(report, property_ids::SELECTED_LIGHT_RULE_INDEX, rule.index)
    }

    pub fn disable_light_rule(&mut self, rule_index: u8) -> bool {
        let report = LightRuleReport {
            index: rule_index,
            flags: 0,
            ..LightRuleReport::default()
        };
        self.indexed_light_write(report, property_ids::SELECTED_LIGHT_RULE_INDEX, rule_index)
    }

    pub fn send_led_mapping(&mut self, mapping: &LedMapping) -> bool {
        let report = mapping.to_report();
        self.indexed_mapping_write(report, mapping.index)
    }

    pub fn disable_led_mapping(&mut self, mapping_index: u8) -> bool {
        let report = LedMappingReport {
            index: mapping_index,
            flags: 0,
            ..LedMappingReport::default()
        };
        self.indexed_mapping_write(report, mapping_index)
    }

    /// Select-then-access write for the light rule table. The three legs are
    /// one logical operation; callers never see the selection step alone.
    fn indexed_light_write(&mut self, report: LightRuleReport, property_id: u32, index: u8) -> bool {
        let send_result = self.reporter.send(&report);
        let select_result = self
            .reporter
            .send(&SetPropertyReport::select(property_id, u32::from(index)));
        let get_result = self.reporter.get::<LightRuleReport>();

        self.changes |= DeviceChanges::LIGHTS;
        self.has_unsaved_changes = true;
        match &get_result {
            ReadResult::Success(echo) => self.apply_light_rule(echo),
            _ => self.apply_light_rule(&report),
        }
        select_result && send_result && get_result.is_success()
    }

    fn indexed_mapping_write(&mut self, report: LedMappingReport, index: u8) -> bool {
        let send_result = self.reporter.send(&report);
        let select_result = self.reporter.send(&SetPropertyReport::select(
            property_ids::SELECTED_LED_MAPPING_INDEX,
            u32::from(index),
        ));
        let get_result = self.reporter.get::<LedMappingReport>();

        self.changes |= DeviceChanges::LIGHTS;
        self.has_unsaved_changes = true;
        match &get_result {
            ReadResult::Success(echo) => self.apply_led_mapping(echo),
            _ => self.apply_led_mapping(&report),
        }
        select_result && send_result && get_result.is_success()
    }

    /// Push one sensor's analog front-end configuration.
    pub fn send_adc_config(&mut self, sensor_index: usize, adc: &AdcState) -> bool {
        if sensor_index >= usize::from(self.pad.num_sensors) {
            return false;
        }

        let mut flags = 0u8;
        if adc.disabled {
            flags |= adc_config_flags::DISABLED;
        }
        if adc.set_resistor {
            flags |= adc_config_flags::SET_RESISTOR;
        }
        if adc.aref5 {
            flags |= adc_config_flags::AREF_5V;
        }
        if adc.aref3 {
            flags |= adc_config_flags::AREF_3V;
        }
        let report = AdcConfigReport {
            index: sensor_index as u8,
            flags,
            resistor_value: adc.resistor_value,
        };

        let send_result = self.reporter.send(&report);
        let select_result = self.reporter.send(&SetPropertyReport::select(
            property_ids::SELECTED_SENSOR_INDEX,
            sensor_index as u32,
        ));
        let get_result = self.reporter.get::<AdcConfigReport>();

        self.changes |= DeviceChanges::ADC;
        self.has_unsaved_changes = true;
        match &get_result {
            ReadResult::Success(echo) => self.apply_adc_config(echo),
            _ => self.apply_adc_config(&report),
        }
        select_result && send_result && get_result.is_success()
    }

    /// Persist the device's live configuration, only when something changed.
    pub fn save_changes(&mut self) {
        if self.has_unsaved_changes {
            self.reporter.send_save_configuration();
            self.has_unsaved_changes = false;
        }
    }

    /// Fire-and-forget reboot (into the bootloader where supported).
    pub fn reset(&mut self) {
        self.reporter.send_reset();
    }

    /// Have the device load and persist its factory defaults.
    pub fn factory_reset(&mut self) {
        self.reporter.send_factory_reset();
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn polling_rate(&self) -> u32 {
        self.polling.polling_rate
    }

    pub fn state(&self) -> &PadState {
        &self.pad
    }

    pub fn lights(&self) -> &LightsState {
        &self.lights
    }

    pub fn sensor(&self, index: usize) -> Option<&SensorState> {
        if index < usize::from(self.pad.num_sensors) {
            self.sensors.get(index)
        } else {
            None
        }
    }

    pub fn adc(&self, index: usize) -> Option<&AdcState> {
        if index < usize::from(self.pad.num_sensors) {
            self.adcs.get(index)
        } else {
            None
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    /// Take and clear the accumulated change flags.
    pub fn pop_changes(&mut self) -> DeviceChanges {
        std::mem::take(&mut self.changes)
    }
}

impl Drop for PadDevice {
    /// Flush-on-session-end: unsaved changes are persisted when the device
    /// is replaced, disconnected or the application shuts down. On a dead
    /// transport the save simply fails and is dropped.
    fn drop(&mut self) {
        self.save_changes();
    }
}
