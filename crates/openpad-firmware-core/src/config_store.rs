//! Magic-byte-guarded configuration block store.
//!
//! The block layout reuses the wire payload encoding of each report, so the
//! stored form is byte-order independent just like the protocol itself. A
//! short magic sequence embedding the firmware version guards the block:
//! missing or mismatched magic (fresh part, or a version bump) loads factory
//! defaults instead of garbage.

use hid_pad_protocol::{
    AdcConfigReport, BoardType, LedMappingReport, LightRuleReport, MAX_LED_MAPPINGS,
    MAX_LIGHT_RULES, MAX_SENSOR_COUNT, NameReport, PadConfigurationReport, ProtocolResult, Report,
    RgbColor, UNMAPPED_BUTTON, led_mapping_flags, light_rule_flags,
};
use thiserror::Error;

use crate::{FIRMWARE_VERSION_MAJOR, FIRMWARE_VERSION_MINOR};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage access out of bounds: offset {offset} + {len} exceeds capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

/// Persistent block storage service (EEPROM on hardware).
pub trait Storage {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

/// In-memory storage with erased-cell semantics (unwritten cells read 0xFF),
/// used by tests and host-side embeddings.
pub struct MemoryStorage {
    cells: Vec<u8>,
}

impl MemoryStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0xFF; capacity],
        }
    }
}

impl Storage for MemoryStorage {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let cells = self
            .cells
            .get(offset..offset + buf.len())
            .ok_or(StorageError::OutOfBounds {
                offset,
                len: buf.len(),
                capacity: self.cells.len(),
            })?;
        buf.copy_from_slice(cells);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let capacity = self.cells.len();
        let cells =
            self.cells
                .get_mut(offset..offset + data.len())
                .ok_or(StorageError::OutOfBounds {
                    offset,
                    len: data.len(),
                    capacity,
                })?;
        cells.copy_from_slice(data);
        Ok(())
    }
}

/// The firmware's live configuration: everything the host can set, plus the
/// selection registers for the indexed tables.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareConfig {
    pub pad: PadConfigurationReport,
    pub name: NameReport,
    pub light_rules: [LightRuleReport; MAX_LIGHT_RULES],
    pub led_mappings: [LedMappingReport; MAX_LED_MAPPINGS],
    pub selected_light_rule_index: u8,
    pub selected_led_mapping_index: u8,
    pub selected_sensor_index: u8,
    pub adc_configs: [AdcConfigReport; MAX_SENSOR_COUNT],
}

impl FirmwareConfig {
    /// Serialized block size.
    pub const BLOCK_LEN: usize = PadConfigurationReport::PAYLOAD_LEN
        + NameReport::PAYLOAD_LEN
        + MAX_LIGHT_RULES * LightRuleReport::PAYLOAD_LEN
        + MAX_LED_MAPPINGS * LedMappingReport::PAYLOAD_LEN
        + 3
        + MAX_SENSOR_COUNT * AdcConfigReport::PAYLOAD_LEN;

    pub fn encode_block(&self) -> ProtocolResult<Vec<u8>> {
        let mut block = vec![0u8; Self::BLOCK_LEN];
        let mut at = 0;
        put(&self.pad, &mut block, &mut at)?;
        put(&self.name, &mut block, &mut at)?;
        for rule in &self.light_rules {
            put(rule, &mut block, &mut at)?;
        }
        for mapping in &self.led_mappings {
            put(mapping, &mut block, &mut at)?;
        }
        block[at] = self.selected_light_rule_index;
        block[at + 1] = self.selected_led_mapping_index;
        block[at + 2] = self.selected_sensor_index;
        at += 3;
        for adc in &self.adc_configs {
            put(adc, &mut block, &mut at)?;
        }
        Ok(block)
    }

    pub fn decode_block(block: &[u8]) -> ProtocolResult<Self> {
        if block.len() != Self::BLOCK_LEN {
            return Err(hid_pad_protocol::ProtocolError::InvalidLength {
                expected: Self::BLOCK_LEN,
                actual: block.len(),
            });
        }

        let mut at = 0;
        let pad = take::<PadConfigurationReport>(block, &mut at)?;
        let name = take::<NameReport>(block, &mut at)?;
        let mut light_rules = [LightRuleReport::default(); MAX_LIGHT_RULES];
        for rule in &mut light_rules {
            *rule = take(block, &mut at)?;
        }
        let mut led_mappings = [LedMappingReport::default(); MAX_LED_MAPPINGS];
        for mapping in &mut led_mappings {
            *mapping = take(block, &mut at)?;
        }
        let selected_light_rule_index = block[at];
        let selected_led_mapping_index = block[at + 1];
        let selected_sensor_index = block[at + 2];
        at += 3;
        let mut adc_configs = [AdcConfigReport::default(); MAX_SENSOR_COUNT];
        for adc in &mut adc_configs {
            *adc = take(block, &mut at)?;
        }

        Ok(Self {
            pad,
            name,
            light_rules,
            led_mappings,
            selected_light_rule_index,
            selected_led_mapping_index,
            selected_sensor_index,
            adc_configs,
        })
    }
}

fn put<R: Report>(report: &R, block: &mut [u8], at: &mut usize) -> ProtocolResult<()> {
    let end = *at + R::PAYLOAD_LEN;
    report.encode(&mut block[*at..end])?;
    *at = end;
    Ok(())
}

fn take<R: Report>(block: &[u8], at: &mut usize) -> ProtocolResult<R> {
    let end = *at + R::PAYLOAD_LEN;
    let report = R::decode(&block[*at..end])?;
    *at = end;
    Ok(report)
}

/// Guard bytes ahead of the block. The firmware version rides along so a
/// version bump re-seeds defaults on first boot.
const MAGIC_BYTES: [u8; 5] = [9, 74, 9, FIRMWARE_VERSION_MAJOR, FIRMWARE_VERSION_MINOR];
const MAGIC_ADDRESS: usize = 0;
const CONFIGURATION_ADDRESS: usize = MAGIC_ADDRESS + MAGIC_BYTES.len();

/// Minimum storage capacity the store needs.
pub const STORAGE_LEN: usize = CONFIGURATION_ADDRESS + FirmwareConfig::BLOCK_LEN;

pub struct ConfigStore;

impl ConfigStore {
    /// Load the stored configuration, falling back to the board's factory
    /// defaults when the magic guard does not match.
    pub fn load(storage: &impl Storage, board: BoardType) -> FirmwareConfig {
        let mut magic = [0u8; MAGIC_BYTES.len()];
        if storage.read(MAGIC_ADDRESS, &mut magic).is_err() || magic != MAGIC_BYTES {
            return Self::factory_defaults(board);
        }

        let mut block = vec![0u8; FirmwareConfig::BLOCK_LEN];
        if storage.read(CONFIGURATION_ADDRESS, &mut block).is_err() {
            return Self::factory_defaults(board);
        }
        FirmwareConfig::decode_block(&block).unwrap_or_else(|_| Self::factory_defaults(board))
    }

    /// Persist: configuration block first, then the magic guard, so a write
    /// interrupted mid-block never validates.
    pub fn store(storage: &mut impl Storage, config: &FirmwareConfig) -> Result<(), StorageError> {
        let block = config
            .encode_block()
            .unwrap_or_else(|_| vec![0u8; FirmwareConfig::BLOCK_LEN]);
        storage.write(CONFIGURATION_ADDRESS, &block)?;
        storage.write(MAGIC_ADDRESS, &MAGIC_BYTES)
    }

    pub fn factory_defaults(board: BoardType) -> FirmwareConfig {
        let mut pad = PadConfigurationReport {
            sensor_thresholds: [400; MAX_SENSOR_COUNT],
            sensor_to_button_mapping: [UNMAPPED_BUTTON; MAX_SENSOR_COUNT],
            release_threshold: 0.95,
        };

        let mut name = NameReport::default();
        let mut light_rules = [LightRuleReport::default(); MAX_LIGHT_RULES];
        let mut led_mappings = [LedMappingReport::default(); MAX_LED_MAPPINGS];

        match board {
            BoardType::FsrMiniPad | BoardType::FsrMiniPad2 => {
                // Four arrow panels on sensors 2-5, eight LEDs per panel.
                for (sensor, button) in (2..=5u8).zip(0u8..) {
                    pad.sensor_to_button_mapping[usize::from(sensor)] = button;
                }
                name.set_text("FSR Mini pad").ok();
                light_rules[0] = default_rule(0, RgbColor::new(2, 0, 0), RgbColor::new(255, 0, 0));
                light_rules[1] = default_rule(1, RgbColor::new(0, 0, 2), RgbColor::new(0, 0, 255));
                led_mappings[0] = default_mapping(0, 0, 5, 0, 8);
                led_mappings[1] = default_mapping(1, 1, 4, 8, 16);
                led_mappings[2] = default_mapping(2, 1, 2, 24, 32);
                led_mappings[3] = default_mapping(3, 0, 3, 16, 24);
            }
            BoardType::FsrIo1 => {
                for sensor in 0..8u8 {
                    pad.sensor_to_button_mapping[usize::from(sensor)] = sensor;
                }
                name.set_text("Untitled FSR Device").ok();
                light_rules[0] = default_rule(0, RgbColor::new(0, 0, 2), RgbColor::new(0, 0, 255));
                for i in 0..8u8 {
                    led_mappings[usize::from(i)] = default_mapping(i, 0, i, i, i + 1);
                }
            }
            _ => {
                name.set_text("Untitled FSR Device").ok();
            }
        }

        FirmwareConfig {
            pad,
            name,
            light_rules,
            led_mappings,
            selected_light_rule_index: 0,
            selected_led_mapping_index: 0,
            selected_sensor_index: 0,
            adc_configs: [AdcConfigReport {
                index: 0,
                flags: 0,
                resistor_value: 150,
            }; MAX_SENSOR_COUNT],
        }
    }
}

fn default_rule(index: u8, off: RgbColor, off_fade: RgbColor) -> LightRuleReport {
    LightRuleReport {
        index,
        flags: light_rule_flags::ENABLED | light_rule_flags::FADE_OFF,
        on_color: RgbColor::new(100, 100, 100),
        off_color: off,
        on_fade_color: RgbColor::new(0, 0, 0),
        off_fade_color: off_fade,
    }
}

fn default_mapping(index: u8, rule: u8, sensor: u8, begin: u8, end: u8) -> LedMappingReport {
    LedMappingReport {
        index,
        flags: led_mapping_flags::ENABLED,
        light_rule_index: rule,
        sensor_index: sensor,
        led_index_begin: begin,
        led_index_end: end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_storage_loads_factory_defaults() {
        let storage = MemoryStorage::new(STORAGE_LEN);
        let config = ConfigStore::load(&storage, BoardType::FsrMiniPad);

        assert_eq!(config.name.text(), "FSR Mini pad");
        assert_eq!(config.pad.sensor_thresholds[0], 400);
        assert_eq!(config.pad.sensor_to_button_mapping[2], 0);
        assert_eq!(config.pad.sensor_to_button_mapping[0], UNMAPPED_BUTTON);
        assert_eq!(
            config.light_rules[0].flags,
            light_rule_flags::ENABLED | light_rule_flags::FADE_OFF
        );
        assert_eq!(config.led_mappings[3].sensor_index, 3);
    }

    #[test]
    fn test_store_then_load_round_trips() {
        let mut storage = MemoryStorage::new(STORAGE_LEN);
        let mut config = ConfigStore::factory_defaults(BoardType::FsrMiniPad);
        config.pad.sensor_thresholds[3] = 612;
        config.selected_sensor_index = 7;
        ConfigStore::store(&mut storage, &config).expect("store");

        let loaded = ConfigStore::load(&storage, BoardType::FsrMiniPad);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_corrupt_magic_falls_back_to_defaults() {
        let mut storage = MemoryStorage::new(STORAGE_LEN);
        let mut config = ConfigStore::factory_defaults(BoardType::Leonardo);
        config.pad.sensor_thresholds[0] = 999;
        ConfigStore::store(&mut storage, &config).expect("store");

        // Clobber one magic byte: the stored block no longer validates.
        storage.write(0, &[0xAA]).expect("write");
        let loaded = ConfigStore::load(&storage, BoardType::Leonardo);
        assert_eq!(loaded.pad.sensor_thresholds[0], 400);
    }

    #[test]
    fn test_undersized_storage_is_an_error() {
        let mut storage = MemoryStorage::new(16);
        let config = ConfigStore::factory_defaults(BoardType::Unknown);
        assert!(matches!(
            ConfigStore::store(&mut storage, &config),
            Err(StorageError::OutOfBounds { .. })
        ));
        // Loading from it still degrades gracefully.
        let loaded = ConfigStore::load(&storage, BoardType::Unknown);
        assert_eq!(loaded.name.text(), "Untitled FSR Device");
    }

    #[test]
    fn test_generic_board_has_no_default_lights() {
        let config = ConfigStore::factory_defaults(BoardType::Teensy2);
        assert!(
            config
                .light_rules
                .iter()
                .all(|rule| rule.flags & light_rule_flags::ENABLED == 0)
        );
        assert!(
            config
                .led_mappings
                .iter()
                .all(|mapping| mapping.flags & led_mapping_flags::ENABLED == 0)
        );
    }
}
