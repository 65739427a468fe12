//! Command implementations over an open device session.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use hid_pad_protocol::RgbColor;
use openpad_device::{AdcState, DeviceChanges, DeviceContext, LedMapping, LightRule};
use openpad_hid_common::HidapiBackend;

use crate::LightsCommands;
use crate::output;

/// Tick cadence of the polling loop.
const TICK: Duration = Duration::from_millis(10);

pub struct Session {
    context: DeviceContext,
    json: bool,
}

impl Session {
    /// Open the HID backend and tick until a pad connects or the wait
    /// budget runs out.
    pub fn open(wait_secs: u64, json: bool) -> Result<Self> {
        let backend = HidapiBackend::new().context("HID backend initialization failed")?;
        let mut context = DeviceContext::new(Box::new(backend));

        let deadline = Instant::now() + Duration::from_secs(wait_secs);
        loop {
            context.update();
            if context.pad().is_some() {
                return Ok(Self { context, json });
            }
            if Instant::now() >= deadline {
                let denylisted: Vec<String> = context
                    .failed_devices()
                    .map(|(path, name)| format!("{name} ({path})"))
                    .collect();
                if denylisted.is_empty() {
                    bail!("no compatible pad found");
                }
                bail!(
                    "no compatible pad found; unresponsive candidates: {}",
                    denylisted.join(", ")
                );
            }
            thread::sleep(TICK);
        }
    }

    pub fn info(&mut self) -> Result<()> {
        output::print_info(&self.context, self.json)
    }

    pub fn monitor(&mut self, seconds: Option<u64>) -> Result<()> {
        let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));
        let mut last_line = Instant::now();

        loop {
            let changes = self.context.update();
            if !changes.is_empty() {
                tracing::debug!(bits = changes.bits(), "device changes");
            }
            if changes.contains(DeviceChanges::DEVICE) {
                match self.context.pad() {
                    Some(pad) => println!("connected: {}", pad.name),
                    None => println!("disconnected"),
                }
            }

            if last_line.elapsed() >= Duration::from_secs(1) {
                last_line = Instant::now();
                output::print_monitor_line(&self.context, self.json)?;
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(());
                }
            }
            thread::sleep(TICK);
        }
    }

    pub fn set_threshold(&mut self, sensor: usize, value: f64) -> Result<()> {
        if !self.context.set_threshold(sensor, value) {
            bail!("setting threshold failed");
        }
        let applied = self
            .context
            .sensor(sensor)
            .map(|s| s.threshold)
            .unwrap_or_default();
        println!("sensor {sensor} threshold set to {applied:.3}");
        Ok(())
    }

    pub fn set_release_threshold(&mut self, value: f64) -> Result<()> {
        if !self.context.set_release_threshold(value) {
            bail!("setting release threshold failed");
        }
        let applied = self.context.pad().map(|p| p.release_threshold).unwrap_or_default();
        println!("release threshold set to {applied:.3}");
        Ok(())
    }

    pub fn map_button(&mut self, sensor: usize, button: u8) -> Result<()> {
        if !self.context.set_button_mapping(sensor, button) {
            bail!("setting button mapping failed");
        }
        match self.context.sensor(sensor).map(|s| s.button) {
            Some(0) => println!("sensor {sensor} unmapped"),
            Some(applied) => println!("sensor {sensor} mapped to button {applied}"),
            None => {}
        }
        Ok(())
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        if !self.context.set_device_name(name) {
            bail!("renaming failed");
        }
        println!("renamed to: {name}");
        Ok(())
    }

    pub fn lights(&mut self, command: LightsCommands) -> Result<()> {
        match command {
            LightsCommands::List => output::print_lights(&self.context, self.json),
            LightsCommands::SetRule {
                index,
                on,
                off,
                on_fade,
                off_fade,
                fade_on,
                fade_off,
            } => {
                let rule = LightRule {
                    index,
                    fade_on,
                    fade_off,
                    on_color: parse_color(&on)?,
                    off_color: parse_color(&off)?,
                    on_fade_color: parse_color(&on_fade)?,
                    off_fade_color: parse_color(&off_fade)?,
                };
                if !self.context.send_light_rule(&rule) {
                    bail!("sending light rule failed");
                }
                println!("light rule {index} set");
                Ok(())
            }
            LightsCommands::DisableRule { index } => {
                if !self.context.disable_light_rule(index) {
                    bail!("disabling light rule failed");
                }
                println!("light rule {index} disabled");
                Ok(())
            }
            LightsCommands::SetMapping {
                index,
                rule,
                sensor,
                led_begin,
                led_end,
            } => {
                let mapping = LedMapping {
                    index,
                    light_rule_index: rule,
                    sensor_index: sensor,
                    led_index_begin: led_begin,
                    led_index_end: led_end,
                };
                if !self.context.send_led_mapping(&mapping) {
                    bail!("sending LED mapping failed");
                }
                println!("led mapping {index} set");
                Ok(())
            }
            LightsCommands::DisableMapping { index } => {
                if !self.context.disable_led_mapping(index) {
                    bail!("disabling LED mapping failed");
                }
                println!("led mapping {index} disabled");
                Ok(())
            }
        }
    }

    pub fn adc(
        &mut self,
        sensor: usize,
        resistor: Option<u8>,
        aref5: bool,
        aref3: bool,
        disabled: bool,
    ) -> Result<()> {
        let adc = AdcState {
            disabled,
            set_resistor: resistor.is_some(),
            aref5,
            aref3,
            resistor_value: resistor.unwrap_or_default(),
        };
        if !self.context.send_adc_config(sensor, &adc) {
            bail!("sending ADC configuration failed");
        }
        println!("sensor {sensor} ADC configuration set");
        Ok(())
    }

    pub fn save(&mut self) -> Result<()> {
        self.context.save_changes();
        println!("configuration saved");
        Ok(())
    }

    pub fn reboot(&mut self) -> Result<()> {
        self.context.send_device_reset();
        println!("reboot requested");
        Ok(())
    }

    pub fn factory_reset(&mut self) -> Result<()> {
        self.context.send_factory_reset();
        println!("factory reset requested");
        Ok(())
    }
}

fn parse_color(hex: &str) -> Result<RgbColor> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        bail!("expected RRGGBB hex color, got '{hex}'");
    }
    let parse = |range: std::ops::Range<usize>| {
        hex.get(range.clone())
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .with_context(|| format!("bad hex color component in '{hex}'"))
    };
    Ok(RgbColor {
        red: parse(0..2)?,
        green: parse(2..4)?,
        blue: parse(4..6)?,
    })
}
