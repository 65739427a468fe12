//! Drain/aggregation behavior and mutating operations against the mirror.

mod common;

use std::time::Duration;

use common::*;
use hid_pad_protocol::{read_u16_le, report_ids};
use openpad_device::{DeviceChanges, LedMapping};

#[test]
fn test_drain_is_bounded_at_100_reports() {
    let (mut context, _backend, device, t0) = connected_context(0);

    for _ in 0..150 {
        device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(0, 200));
    }
    context.update_at(t0 + Duration::from_millis(10));

    assert_eq!(device.read_calls_remaining(report_ids::SENSOR_VALUES), 50);
    let sensor_reads = device
        .reads()
        .iter()
        .filter(|id| **id == report_ids::SENSOR_VALUES)
        .count();
    assert_eq!(sensor_reads, 100);
}

#[test]
fn test_drain_stops_on_first_no_data() {
    let (mut context, _backend, device, t0) = connected_context(0);

    for _ in 0..3 {
        device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(0, 512));
    }
    context.update_at(t0 + Duration::from_millis(10));

    // Three data reads plus the would-block that ended the drain.
    let sensor_reads = device
        .reads()
        .iter()
        .filter(|id| **id == report_ids::SENSOR_VALUES)
        .count();
    assert_eq!(sensor_reads, 4);
    let sensor = context.sensor(0).expect("sensor");
    assert!((sensor.value - 512.0 / 1024.0).abs() < 1e-9);
}

#[test]
fn test_magnitudes_average_across_burst() {
    let (mut context, _backend, device, t0) = connected_context(0);

    device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(0, 400));
    device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(0, 600));
    context.update_at(t0 + Duration::from_millis(10));

    let sensor = context.sensor(0).expect("sensor");
    assert!((sensor.value - 500.0 / 1024.0).abs() < 1e-9);
}

#[test]
fn test_momentary_press_survives_averaging() {
    let (mut context, _backend, device, t0) = connected_context(0);

    // Button 1 (bit 0) is down in exactly one report of the burst; sensor 0
    // is mapped to button 1 by the standard configuration.
    for i in 0..10u16 {
        let bits = if i == 4 { 0x0001 } else { 0 };
        device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(bits, 100));
    }
    context.update_at(t0 + Duration::from_millis(10));

    assert!(context.sensor(0).expect("sensor").pressed);
    // Unmapped sensors never read as pressed.
    assert!(!context.sensor(5).expect("sensor").pressed);
}

#[test]
fn test_press_clears_when_bitmask_goes_quiet() {
    let (mut context, _backend, device, t0) = connected_context(0);

    device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(0x0001, 800));
    context.update_at(t0 + Duration::from_millis(10));
    assert!(context.sensor(0).expect("sensor").pressed);

    device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(0, 100));
    context.update_at(t0 + Duration::from_millis(20));
    assert!(!context.sensor(0).expect("sensor").pressed);
}

#[test]
fn test_polling_rate_over_one_second_window() {
    let (mut context, _backend, device, t0) = connected_context(0);

    for _ in 0..50 {
        device.queue_read(report_ids::SENSOR_VALUES, sensor_payload(0, 300));
    }
    context.update_at(t0 + Duration::from_secs(1));

    assert_eq!(context.polling_rate(), 50);

    // The window resets after a recompute.
    context.update_at(t0 + Duration::from_secs(2));
    assert_eq!(context.polling_rate(), 0);
}

#[test]
fn test_set_threshold_clamps_and_round_trips() {
    let (mut context, _backend, device, _t0) = connected_context(0);

    assert!(context.set_threshold(0, 1.5));
    let writes = device.writes();
    let (id, payload) = writes.first().expect("configuration write");
    assert_eq!(*id, report_ids::PAD_CONFIGURATION);
    assert_eq!(read_u16_le([payload[0], payload[1]]), 1024);

    // Mirror resynced from the device echo.
    let sensor = context.sensor(0).expect("sensor");
    assert!((sensor.threshold - 1.0).abs() < 1e-9);
}

#[test]
fn test_set_threshold_rejects_bad_sensor_index() {
    let (mut context, _backend, device, _t0) = connected_context(0);

    assert!(!context.set_threshold(12, 0.5));
    assert!(device.writes().is_empty());
}

#[test]
fn test_release_threshold_clamps_to_lower_bound() {
    let (mut context, _backend, _device, _t0) = connected_context(0);

    assert!(context.set_release_threshold(0.0));
    let pad = context.pad().expect("connected");
    assert!((pad.release_threshold - f64::from(0.01f32)).abs() < 1e-6);
}

#[test]
fn test_out_of_range_button_mapping_resyncs_to_unmapped() {
    let (mut context, _backend, _device, _t0) = connected_context(0);

    // Button 200 exceeds the declared 16-button count; the echo resync
    // sanitizes the mirror back to unmapped.
    assert!(context.set_button_mapping(5, 200));
    assert_eq!(context.sensor(5).expect("sensor").button, 0);

    assert!(context.set_button_mapping(5, 7));
    assert_eq!(context.sensor(5).expect("sensor").button, 7);
}

#[test]
fn test_button_mapping_sets_change_flag() {
    let (mut context, _backend, _device, t0) = connected_context(0);

    assert!(context.set_button_mapping(0, 2));
    let changes = context.update_at(t0 + Duration::from_millis(10));
    assert!(changes.contains(DeviceChanges::BUTTON_MAPPING));
}

#[test]
fn test_send_led_mapping_wire_sequence() {
    let (mut context, _backend, device, t0) = connected_context(32);
    device.clear_writes();
    device.clear_reads();

    let mapping = LedMapping {
        index: 3,
        light_rule_index: 1,
        sensor_index: 5,
        led_index_begin: 8,
        led_index_end: 16,
    };
    assert!(context.send_led_mapping(&mapping));

    let writes = device.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].0, report_ids::LED_MAPPING);
    assert_eq!(writes[0].1, vec![3, 1, 1, 5, 8, 16]);
    assert_eq!(writes[1].0, report_ids::SET_PROPERTY);
    assert_eq!(writes[1].1, vec![1, 0, 0, 0, 3, 0, 0, 0]);
    assert_eq!(device.reads(), vec![report_ids::LED_MAPPING]);

    // Mirror holds the echoed entry and the LIGHTS flag is raised.
    let lights = context.lights().expect("connected");
    assert_eq!(lights.led_mappings.get(&3), Some(&mapping));
    let changes = context.update_at(t0 + Duration::from_millis(10));
    assert!(changes.contains(DeviceChanges::LIGHTS));
}

#[test]
fn test_disable_led_mapping_removes_mirror_entry() {
    let (mut context, _backend, _device, _t0) = connected_context(32);

    let mapping = LedMapping {
        index: 2,
        light_rule_index: 0,
        sensor_index: 1,
        led_index_begin: 0,
        led_index_end: 8,
    };
    assert!(context.send_led_mapping(&mapping));
    assert!(context.lights().expect("connected").led_mappings.contains_key(&2));

    assert!(context.disable_led_mapping(2));
    assert!(!context.lights().expect("connected").led_mappings.contains_key(&2));
}

#[test]
fn test_partial_failure_reports_false_but_mirror_follows_intent() {
    let (mut context, _backend, device, t0) = connected_context(32);
    device.queue_failure(report_ids::LED_MAPPING);

    let mapping = LedMapping {
        index: 4,
        light_rule_index: 0,
        sensor_index: 2,
        led_index_begin: 0,
        led_index_end: 4,
    };
    // The echo leg fails: overall failure, but the change flag still fires
    // and the mirror keeps the intended entry.
    assert!(!context.send_led_mapping(&mapping));
    assert!(context.lights().expect("connected").led_mappings.contains_key(&4));
    let changes = context.update_at(t0 + Duration::from_millis(10));
    assert!(changes.contains(DeviceChanges::LIGHTS));
}

#[test]
fn test_rename_round_trips_and_flags() {
    let (mut context, _backend, device, t0) = connected_context(0);

    assert!(context.set_device_name("Stage Left"));
    assert_eq!(context.pad().expect("connected").name, "Stage Left");
    let changes = context.update_at(t0 + Duration::from_millis(10));
    assert!(changes.contains(DeviceChanges::NAME));

    device.clear_writes();
    let long = "x".repeat(60);
    assert!(!context.set_device_name(&long));
    assert!(device.writes().is_empty(), "over-long name is never sent");
}

#[test]
fn test_adc_config_uses_sensor_selection() {
    let (mut context, _backend, device, t0) = connected_context(0);

    let adc = openpad_device::AdcState {
        disabled: false,
        set_resistor: true,
        aref5: true,
        aref3: false,
        resistor_value: 150,
    };
    assert!(context.send_adc_config(2, &adc));

    let writes = device.writes();
    assert_eq!(writes[0].0, report_ids::ADC_CONFIG);
    assert_eq!(writes[0].1, vec![2, 0b110, 150]);
    assert_eq!(writes[1].0, report_ids::SET_PROPERTY);
    assert_eq!(writes[1].1, vec![2, 0, 0, 0, 2, 0, 0, 0]);

    let mirrored = context.adc(2).expect("adc");
    assert!(mirrored.set_resistor);
    assert_eq!(mirrored.resistor_value, 150);
    let changes = context.update_at(t0 + Duration::from_millis(10));
    assert!(changes.contains(DeviceChanges::ADC));
}

#[test]
fn test_save_changes_writes_once_while_dirty() {
    let (mut context, _backend, device, _t0) = connected_context(0);

    context.save_changes();
    assert!(device.writes().is_empty(), "clean mirror saves nothing");

    assert!(context.set_threshold(0, 0.5));
    device.clear_writes();
    context.save_changes();
    context.save_changes();

    let saves = device
        .writes()
        .iter()
        .filter(|(id, _)| *id == report_ids::SAVE_CONFIGURATION)
        .count();
    assert_eq!(saves, 1);
}

#[test]
fn test_teardown_flushes_unsaved_changes() {
    let (mut context, _backend, device, _t0) = connected_context(0);

    assert!(context.set_threshold(0, 0.5));
    device.clear_writes();
    drop(context);

    assert!(
        device
            .writes()
            .iter()
            .any(|(id, _)| *id == report_ids::SAVE_CONFIGURATION),
        "dropping the context persists unsaved changes"
    );
}

#[test]
fn test_commands_are_fire_and_forget() {
    let (mut context, _backend, device, _t0) = connected_context(0);

    context.send_device_reset();
    context.send_factory_reset();

    let ids: Vec<u8> = device.writes().iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![report_ids::RESET, report_ids::FACTORY_RESET]);
    assert!(device.reads().is_empty(), "no read-back for commands");
}
