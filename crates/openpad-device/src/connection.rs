//! Device discovery and the single connection slot.
//!
//! Devices that are incompatible or failed communication are tracked in a
//! failure denylist keyed by device path, so discovery does not loop on a
//! broken device every tick. Entries are pruned when the path disappears
//! from a fresh enumeration: unplugging and replugging makes the device a
//! new candidate again.

use std::collections::BTreeMap;
use std::time::Instant;

use hid_pad_protocol::{
    IdentificationReport, LedMappingReport, LightRuleReport, MAX_LED_MAPPINGS, MAX_LIGHT_RULES,
    NameReport, PadConfigurationReport, SetPropertyReport, led_mapping_flags, light_rule_flags,
    property_ids,
};
use openpad_hid_common::{HidBackend, HidDeviceInfo};

use crate::pad_device::PadDevice;
use crate::reporter::{ReadResult, Reporter};

pub struct ConnectionManager {
    backend: Box<dyn HidBackend>,
    connected: Option<PadDevice>,
    failed_devices: BTreeMap<String, String>,
}

impl ConnectionManager {
    pub fn new(backend: Box<dyn HidBackend>) -> Self {
        Self {
            backend,
            connected: None,
            failed_devices: BTreeMap::new(),
        }
    }

    pub fn connected_device(&mut self) -> Option<&mut PadDevice> {
        self.connected.as_mut()
    }

    pub fn pad_device(&self) -> Option<&PadDevice> {
        self.connected.as_ref()
    }

    /// Enumerate, prune the denylist of unplugged paths, then try candidates
    /// in enumeration order until one connects. Returns whether a device is
    /// connected afterwards.
    pub fn discover_device(&mut self, now: Instant) -> bool {
        let found = match self.backend.enumerate() {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(%error, "device enumeration failed");
                return self.connected.is_some();
            }
        };

        let unplugged: Vec<String> = self
            .failed_devices
            .keys()
            .filter(|path| !found.iter().any(|device| device.path == **path))
            .cloned()
            .collect();
        for path in unplugged {
            if let Some(name) = self.failed_devices.remove(&path) {
                tracing::info!(%path, %name, "failed device removed");
            }
        }

        for device in &found {
            if !self.failed_devices.contains_key(&device.path) && self.connect_to_device(device, now)
            {
                break;
            }
        }

        self.connected.is_some()
    }

    fn connect_to_device(&mut self, info: &HidDeviceInfo, now: Instant) -> bool {
        // Vendor/product mismatch is not a failure, just not a candidate.
        if !info.is_supported_pad() {
            return false;
        }

        let transport = match self.backend.open(info) {
            Ok(transport) => transport,
            Err(error) => {
                tracing::warn!(path = %info.path, %error, "open failed");
                self.add_incompatible_device(info);
                return false;
            }
        };

        // The name and configuration probes are mandatory. If both answer,
        // the device is assumed valid.
        let mut reporter = Reporter::new(transport);
        let name = match reporter.get::<NameReport>() {
            ReadResult::Success(name) => name,
            _ => {
                self.add_incompatible_device(info);
                return false;
            }
        };
        let configuration = match reporter.get::<PadConfigurationReport>() {
            ReadResult::Success(configuration) => configuration,
            _ => {
                self.add_incompatible_device(info);
                return false;
            }
        };

        // No identification means older firmware; substitute defaults and
        // carry on.
        let identification = match reporter.get::<IdentificationReport>() {
            ReadResult::Success(identification) => identification,
            _ => IdentificationReport::legacy_defaults(),
        };

        let mut light_rules = Vec::new();
        let mut led_mappings = Vec::new();
        if identification.led_count > 0 {
            Self::read_light_tables(&mut reporter, &mut light_rules, &mut led_mappings);
        }

        let device = PadDevice::new(
            reporter,
            &info.path,
            &name,
            &configuration,
            &identification,
            &light_rules,
            &led_mappings,
            now,
        );

        tracing::info!(
            name = %device.state().name,
            product = info.product.as_deref().unwrap_or(""),
            manufacturer = info.manufacturer.as_deref().unwrap_or(""),
            board = %device.state().board_type,
            firmware_major = device.state().firmware_version.0,
            firmware_minor = device.state().firmware_version.1,
            path = %info.path,
            "new device connected"
        );

        self.connected = Some(device);
        true
    }

    /// Enumerate both flat tables through the selection side channel,
    /// keeping only entries with their enabled flag set.
    fn read_light_tables(
        reporter: &mut Reporter,
        light_rules: &mut Vec<LightRuleReport>,
        led_mappings: &mut Vec<LedMappingReport>,
    ) {
        for index in 0..MAX_LIGHT_RULES as u32 {
            let selected = reporter.send(&SetPropertyReport::select(
                property_ids::SELECTED_LIGHT_RULE_INDEX,
                index,
            ));
            if !selected {
                continue;
            }
            if let ReadResult::Success(rule) = reporter.get::<LightRuleReport>() {
                if rule.flags & light_rule_flags::ENABLED != 0 {
                    tracing::debug!(index = rule.index, flags = rule.flags, "light rule");
                    light_rules.push(rule);
                }
            }
        }

        for index in 0..MAX_LED_MAPPINGS as u32 {
            let selected = reporter.send(&SetPropertyReport::select(
                property_ids::SELECTED_LED_MAPPING_INDEX,
                index,
            ));
            if !selected {
                continue;
            }
            if let ReadResult::Success(mapping) = reporter.get::<LedMappingReport>() {
                if mapping.flags & led_mapping_flags::ENABLED != 0 {
                    tracing::debug!(index = mapping.index, flags = mapping.flags, "led mapping");
                    led_mappings.push(mapping);
                }
            }
        }
    }

    /// Tear down the current device after a hard sensor-read failure.
    ///
    /// The path is denylisted under the pad's last known name, so discovery
    /// skips it until the OS reports it gone (replug clears the entry). The
    /// dropped device flushes unsaved changes on its way out; on a dead
    /// transport that flush fails silently.
    pub fn disconnect_failed_device(&mut self) {
        if let Some(device) = self.connected.take() {
            tracing::info!(path = %device.path(), "device disconnected after read failure");
            self.failed_devices
                .insert(device.path().to_owned(), device.state().name.clone());
        }
    }

    fn add_incompatible_device(&mut self, info: &HidDeviceInfo) {
        // The product string can be missing on failure; such devices are not
        // tracked and will be probed again.
        if let Some(name) = info.display_name() {
            self.failed_devices.insert(info.path.clone(), name);
        }
    }

    /// Denylisted paths and their display names.
    pub fn failed_devices(&self) -> &BTreeMap<String, String> {
        &self.failed_devices
    }
}
