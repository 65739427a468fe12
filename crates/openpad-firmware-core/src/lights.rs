//! Light rule evaluation.
//!
//! Each enabled LED mapping paints its contiguous LED range with the color
//! its light rule picks for the watched sensor's press state. Rules with a
//! fade flag blend between the base and fade color using a caller-supplied
//! phase, so the animation clock stays outside this crate. Mappings whose
//! rule is disabled or out of range render nothing.

use hid_pad_protocol::{
    LedMappingReport, LightRuleReport, RgbColor, led_mapping_flags, light_rule_flags,
};

fn blend_channel(from: u8, to: u8, phase: f64) -> u8 {
    let mixed = f64::from(from) + (f64::from(to) - f64::from(from)) * phase;
    mixed.round().clamp(0.0, 255.0) as u8
}

fn blend(from: RgbColor, to: RgbColor, phase: f64) -> RgbColor {
    RgbColor {
        red: blend_channel(from.red, to.red, phase),
        green: blend_channel(from.green, to.green, phase),
        blue: blend_channel(from.blue, to.blue, phase),
    }
}

/// Paint one frame. `pressed` answers per sensor index; `fade_phase` is the
/// animation position in `[0, 1]`. The frame is cleared first; LED ranges
/// are clipped to the frame length.
pub fn render_frame(
    rules: &[LightRuleReport],
    mappings: &[LedMappingReport],
    pressed: impl Fn(usize) -> bool,
    fade_phase: f64,
    frame: &mut [RgbColor],
) {
    let phase = fade_phase.clamp(0.0, 1.0);
    frame.fill(RgbColor::default());

    for mapping in mappings {
        if mapping.flags & led_mapping_flags::ENABLED == 0 {
            continue;
        }
        let Some(rule) = rules.get(usize::from(mapping.light_rule_index)) else {
            continue;
        };
        if rule.flags & light_rule_flags::ENABLED == 0 {
            continue;
        }

        let is_pressed = pressed(usize::from(mapping.sensor_index));
        let color = if is_pressed {
            if rule.flags & light_rule_flags::FADE_ON != 0 {
                blend(rule.on_color, rule.on_fade_color, phase)
            } else {
                rule.on_color
            }
        } else if rule.flags & light_rule_flags::FADE_OFF != 0 {
            blend(rule.off_color, rule.off_fade_color, phase)
        } else {
            rule.off_color
        };

        let begin = usize::from(mapping.led_index_begin).min(frame.len());
        let end = usize::from(mapping.led_index_end).min(frame.len());
        if let Some(leds) = frame.get_mut(begin..end) {
            leds.fill(color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(flags: u8) -> LightRuleReport {
        LightRuleReport {
            index: 0,
            flags,
            on_color: RgbColor::new(100, 100, 100),
            off_color: RgbColor::new(2, 0, 0),
            on_fade_color: RgbColor::new(0, 0, 0),
            off_fade_color: RgbColor::new(255, 0, 0),
        }
    }

    fn mapping(rule_index: u8, sensor: u8, begin: u8, end: u8) -> LedMappingReport {
        LedMappingReport {
            index: 0,
            flags: led_mapping_flags::ENABLED,
            light_rule_index: rule_index,
            sensor_index: sensor,
            led_index_begin: begin,
            led_index_end: end,
        }
    }

    #[test]
    fn test_pressed_range_paints_on_color() {
        let rules = [rule(light_rule_flags::ENABLED)];
        let mappings = [mapping(0, 3, 0, 4)];
        let mut frame = [RgbColor::default(); 8];

        render_frame(&rules, &mappings, |sensor| sensor == 3, 0.0, &mut frame);

        assert_eq!(frame[0], RgbColor::new(100, 100, 100));
        assert_eq!(frame[3], RgbColor::new(100, 100, 100));
        assert_eq!(frame[4], RgbColor::default());
    }

    #[test]
    fn test_released_range_paints_off_color() {
        let rules = [rule(light_rule_flags::ENABLED)];
        let mappings = [mapping(0, 3, 2, 6)];
        let mut frame = [RgbColor::default(); 8];

        render_frame(&rules, &mappings, |_| false, 0.0, &mut frame);

        assert_eq!(frame[2], RgbColor::new(2, 0, 0));
        assert_eq!(frame[1], RgbColor::default());
    }

    #[test]
    fn test_fade_off_blends_towards_fade_color() {
        let rules = [rule(light_rule_flags::ENABLED | light_rule_flags::FADE_OFF)];
        let mappings = [mapping(0, 0, 0, 1)];
        let mut frame = [RgbColor::default(); 1];

        render_frame(&rules, &mappings, |_| false, 0.0, &mut frame);
        assert_eq!(frame[0], RgbColor::new(2, 0, 0));

        render_frame(&rules, &mappings, |_| false, 1.0, &mut frame);
        assert_eq!(frame[0], RgbColor::new(255, 0, 0));

        render_frame(&rules, &mappings, |_| false, 0.5, &mut frame);
        assert_eq!(frame[0].red, 129); // midway, rounded
        assert_eq!(frame[0].green, 0);
    }

    #[test]
    fn test_disabled_rule_renders_nothing() {
        let rules = [rule(0)];
        let mappings = [mapping(0, 0, 0, 4)];
        let mut frame = [RgbColor::new(9, 9, 9); 4];

        render_frame(&rules, &mappings, |_| true, 0.0, &mut frame);
        assert!(frame.iter().all(|&c| c == RgbColor::default()));
    }

    #[test]
    fn test_dangling_rule_reference_renders_nothing() {
        let rules = [rule(light_rule_flags::ENABLED)];
        let mappings = [mapping(7, 0, 0, 4)]; // no rule 7
        let mut frame = [RgbColor::default(); 4];

        render_frame(&rules, &mappings, |_| true, 0.0, &mut frame);
        assert!(frame.iter().all(|&c| c == RgbColor::default()));
    }

    #[test]
    fn test_led_range_clips_to_frame() {
        let rules = [rule(light_rule_flags::ENABLED)];
        let mappings = [mapping(0, 0, 6, 200)];
        let mut frame = [RgbColor::default(); 8];

        render_frame(&rules, &mappings, |_| true, 0.0, &mut frame);
        assert_eq!(frame[6], RgbColor::new(100, 100, 100));
        assert_eq!(frame[7], RgbColor::new(100, 100, 100));
        assert_eq!(frame[5], RgbColor::default());
    }
}
