//! Human and JSON rendering of mirrored device state.

use anyhow::Result;
use hid_pad_protocol::RgbColor;
use openpad_device::{DeviceContext, LightsState, PadState, SensorState};
use serde::Serialize;

#[derive(Serialize)]
struct InfoSnapshot<'a> {
    pad: &'a PadState,
    sensors: Vec<&'a SensorState>,
    lights: Option<&'a LightsState>,
    polling_rate: u32,
}

fn snapshot(context: &DeviceContext) -> Option<InfoSnapshot<'_>> {
    let pad = context.pad()?;
    let sensors = (0..usize::from(pad.num_sensors))
        .filter_map(|i| context.sensor(i))
        .collect();
    Some(InfoSnapshot {
        pad,
        sensors,
        lights: context.lights(),
        polling_rate: context.polling_rate(),
    })
}

pub fn print_info(context: &DeviceContext, json: bool) -> Result<()> {
    let Some(info) = snapshot(context) else {
        println!("no pad connected");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let pad = info.pad;
    println!("{}", pad.name);
    println!(
        "  board: {}  firmware: v{}.{}",
        pad.board_type, pad.firmware_version.0, pad.firmware_version.1
    );
    println!(
        "  buttons: {}  sensors: {}  leds: {}",
        pad.num_buttons, pad.num_sensors, pad.num_leds
    );
    println!("  release threshold: {:.3}", pad.release_threshold);
    for (i, sensor) in info.sensors.iter().enumerate() {
        let button = match sensor.button {
            0 => "-".to_string(),
            b => b.to_string(),
        };
        println!(
            "  sensor {i:2}: threshold {:.3}  value {:.3}  button {button}{}",
            sensor.threshold,
            sensor.value,
            if sensor.pressed { "  pressed" } else { "" }
        );
    }
    Ok(())
}

pub fn print_monitor_line(context: &DeviceContext, json: bool) -> Result<()> {
    let Some(info) = snapshot(context) else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string(&info)?);
        return Ok(());
    }

    let values: Vec<String> = info
        .sensors
        .iter()
        .map(|sensor| {
            if sensor.pressed {
                format!("[{:.2}]", sensor.value)
            } else {
                format!(" {:.2} ", sensor.value)
            }
        })
        .collect();
    println!("{:4} Hz  {}", info.polling_rate, values.join(" "));
    Ok(())
}

pub fn print_lights(context: &DeviceContext, json: bool) -> Result<()> {
    let Some(lights) = context.lights() else {
        println!("no pad connected");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(lights)?);
        return Ok(());
    }

    if lights.light_rules.is_empty() {
        println!("no light rules configured");
        return Ok(());
    }
    for rule in lights.light_rules.values() {
        let mut fades = Vec::new();
        if rule.fade_on {
            fades.push("fade-on");
        }
        if rule.fade_off {
            fades.push("fade-off");
        }
        println!(
            "rule {}: on {} off {} on-fade {} off-fade {}{}",
            rule.index,
            hex(rule.on_color),
            hex(rule.off_color),
            hex(rule.on_fade_color),
            hex(rule.off_fade_color),
            if fades.is_empty() {
                String::new()
            } else {
                format!("  ({})", fades.join(", "))
            }
        );
        for mapping in lights.mappings_for_rule(rule.index) {
            println!(
                "  mapping {}: sensor {} leds {}..{}",
                mapping.index, mapping.sensor_index, mapping.led_index_begin, mapping.led_index_end
            );
        }
    }

    let orphaned: Vec<u8> = lights
        .led_mappings
        .values()
        .filter(|mapping| !lights.light_rules.contains_key(&mapping.light_rule_index))
        .map(|mapping| mapping.index)
        .collect();
    if !orphaned.is_empty() {
        println!("mappings referencing disabled rules (no visible effect): {orphaned:?}");
    }
    Ok(())
}

fn hex(color: RgbColor) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}
