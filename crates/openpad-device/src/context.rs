//! Application-facing device context.
//!
//! Owned, explicitly constructed replacement for a process-wide device
//! singleton: the application root creates one [`DeviceContext`] with a
//! backend and drives it from its tick timer. All accessors return views of
//! the single active device slot; all commands forward to it and report
//! `false` while disconnected.

use std::time::Instant;

use openpad_hid_common::HidBackend;

use crate::connection::ConnectionManager;
use crate::state::{
    AdcState, DeviceChanges, LedMapping, LightRule, LightsState, PadState, SensorState,
};

pub struct DeviceContext {
    manager: ConnectionManager,
}

impl DeviceContext {
    pub fn new(backend: Box<dyn HidBackend>) -> Self {
        Self {
            manager: ConnectionManager::new(backend),
        }
    }

    /// One tick: discover when disconnected, otherwise drain and aggregate
    /// the sensor stream. Returns the change flags accumulated since the
    /// previous tick; a drain failure tears the device down and surfaces as
    /// [`DeviceChanges::DEVICE`].
    pub fn update(&mut self) -> DeviceChanges {
        self.update_at(Instant::now())
    }

    /// Tick with an explicit clock, for deterministic tests.
    pub fn update_at(&mut self, now: Instant) -> DeviceChanges {
        let mut changes = DeviceChanges::NONE;

        if self.manager.connected_device().is_none() && self.manager.discover_device(now) {
            changes |= DeviceChanges::DEVICE;
        }

        if let Some(device) = self.manager.connected_device() {
            changes |= device.pop_changes();
            if !device.update_sensor_values(now) {
                self.manager.disconnect_failed_device();
                changes |= DeviceChanges::DEVICE;
            }
        }

        changes
    }

    pub fn pad(&self) -> Option<&PadState> {
        self.manager.pad_device().map(|device| device.state())
    }

    pub fn lights(&self) -> Option<&LightsState> {
        self.manager.pad_device().map(|device| device.lights())
    }

    pub fn sensor(&self, sensor_index: usize) -> Option<&SensorState> {
        self.manager
            .pad_device()
            .and_then(|device| device.sensor(sensor_index))
    }

    pub fn adc(&self, sensor_index: usize) -> Option<&AdcState> {
        self.manager
            .pad_device()
            .and_then(|device| device.adc(sensor_index))
    }

    pub fn polling_rate(&self) -> u32 {
        self.manager
            .pad_device()
            .map_or(0, |device| device.polling_rate())
    }

    pub fn set_threshold(&mut self, sensor_index: usize, threshold: f64) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.set_threshold(sensor_index, threshold))
    }

    pub fn set_release_threshold(&mut self, threshold: f64) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.set_release_threshold(threshold))
    }

    pub fn set_button_mapping(&mut self, sensor_index: usize, button: u8) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.set_button_mapping(sensor_index, button))
    }

    pub fn set_device_name(&mut self, name: &str) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.send_name(name))
    }

    pub fn send_light_rule(&mut self, rule: &LightRule) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.send_light_rule(rule))
    }

    pub fn disable_light_rule(&mut self, rule_index: u8) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.disable_light_rule(rule_index))
    }

    pub fn send_led_mapping(&mut self, mapping: &LedMapping) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.send_led_mapping(mapping))
    }

    pub fn disable_led_mapping(&mut self, mapping_index: u8) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.disable_led_mapping(mapping_index))
    }

    pub fn send_adc_config(&mut self, sensor_index: usize, adc: &AdcState) -> bool {
        self.manager
            .connected_device()
            .is_some_and(|device| device.send_adc_config(sensor_index, adc))
    }

    pub fn save_changes(&mut self) {
        if let Some(device) = self.manager.connected_device() {
            device.save_changes();
        }
    }

    pub fn send_device_reset(&mut self) {
        if let Some(device) = self.manager.connected_device() {
            device.reset();
        }
    }

    pub fn send_factory_reset(&mut self) {
        if let Some(device) = self.manager.connected_device() {
            device.factory_reset();
        }
    }

    /// Denylisted device paths with display names, for diagnostics.
    pub fn failed_devices(&self) -> impl Iterator<Item = (&str, &str)> {
        self.manager
            .failed_devices()
            .iter()
            .map(|(path, name)| (path.as_str(), name.as_str()))
    }
}
