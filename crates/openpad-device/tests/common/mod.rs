//! Shared fixtures: a scripted pad wired into a fresh device context.

#![allow(dead_code)]

use std::time::Instant;

use hid_pad_protocol::{
    IdentificationReport, NameReport, PadConfigurationReport, Report, SensorValuesReport,
    UNMAPPED_BUTTON, report_ids,
};
use openpad_device::DeviceContext;
use openpad_hid_common::HidDeviceInfo;
use openpad_hid_common::mock::{MockBackend, MockBackendHandle, MockDeviceHandle};

pub const PAD_PATH: &str = "mock:pad0";

pub fn encode<R: Report>(report: &R) -> Vec<u8> {
    let mut payload = vec![0u8; R::PAYLOAD_LEN];
    report.encode(&mut payload).expect("encode");
    payload
}

pub fn name_payload(text: &str) -> Vec<u8> {
    let mut report = NameReport::default();
    report.set_text(text).expect("name fits");
    encode(&report)
}

/// Standard configuration: threshold 400 everywhere, sensors 0-3 mapped to
/// buttons 1-4, release ratio 0.95.
pub fn config_payload() -> Vec<u8> {
    let mut report = PadConfigurationReport {
        sensor_thresholds: [400; 12],
        sensor_to_button_mapping: [UNMAPPED_BUTTON; 12],
        release_threshold: 0.95,
    };
    for i in 0..4u8 {
        report.sensor_to_button_mapping[usize::from(i)] = i;
    }
    encode(&report)
}

pub fn identification_payload(led_count: u8) -> Vec<u8> {
    let mut report = IdentificationReport {
        firmware_major: 1,
        firmware_minor: 3,
        button_count: 16,
        sensor_count: 12,
        led_count,
        max_sensor_value: 1024,
        ..IdentificationReport::default()
    };
    report.board_type[..10].copy_from_slice(b"fsrminipad");
    encode(&report)
}

pub fn sensor_payload(button_bits: u16, value: u16) -> Vec<u8> {
    let report = SensorValuesReport {
        button_bits,
        sensor_values: [value; 12],
    };
    encode(&report)
}

pub fn pad_info() -> HidDeviceInfo {
    HidDeviceInfo::new(0x1209, 0xb196, PAD_PATH).with_product("FSR Mini pad")
}

/// Script a device that answers the standard probes.
pub fn script_standard_pad(device: &MockDeviceHandle, led_count: u8) {
    device.set_default_response(report_ids::NAME, name_payload("Test Pad"));
    device.set_default_response(report_ids::PAD_CONFIGURATION, config_payload());
    device.set_default_response(report_ids::IDENTIFICATION, identification_payload(led_count));
    if led_count > 0 {
        // Empty tables: every slot answers disabled.
        device.set_default_response(report_ids::LIGHT_RULE, vec![0u8; 14]);
        device.set_default_response(report_ids::LED_MAPPING, vec![0u8; 6]);
    }
}

/// A context with one standard pad already connected at `t0`.
pub fn connected_context(
    led_count: u8,
) -> (DeviceContext, MockBackendHandle, MockDeviceHandle, Instant) {
    let backend = MockBackend::new();
    let backend_handle = backend.handle();
    let device = backend_handle.add_device(pad_info());
    script_standard_pad(&device, led_count);

    let mut context = DeviceContext::new(Box::new(backend));
    let t0 = Instant::now();
    let changes = context.update_at(t0);
    assert!(
        changes.contains(openpad_device::DeviceChanges::DEVICE),
        "standard pad should connect on the first tick"
    );

    device.clear_writes();
    device.clear_reads();
    (context, backend_handle, device, t0)
}
