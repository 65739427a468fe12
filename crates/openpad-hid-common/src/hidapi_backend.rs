//! `hidapi`-backed transport implementation.
//!
//! The sensor stream travels on the interrupt IN pipe (`hid_read`, opened
//! non-blocking so an idle stream reads as would-block); every other report
//! kind is exchanged on the feature pipe. hidapi's feature calls carry the
//! report ID as the first buffer byte in both directions.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};

use crate::{HidBackend, HidCommonError, HidCommonResult, HidDeviceInfo, PadTransport, ReadOutcome};
use hid_pad_protocol::report_ids;

pub struct HidapiBackend {
    api: HidApi,
}

impl HidapiBackend {
    pub fn new() -> HidCommonResult<Self> {
        let api = HidApi::new().map_err(|e| HidCommonError::Init(e.to_string()))?;
        Ok(Self { api })
    }
}

impl HidBackend for HidapiBackend {
    fn enumerate(&mut self) -> HidCommonResult<Vec<HidDeviceInfo>> {
        self.api
            .refresh_devices()
            .map_err(|e| HidCommonError::Init(e.to_string()))?;
        Ok(self
            .api
            .device_list()
            .map(|device| HidDeviceInfo {
                vendor_id: device.vendor_id(),
                product_id: device.product_id(),
                path: device.path().to_string_lossy().into_owned(),
                product: device.product_string().map(str::to_owned),
                manufacturer: device.manufacturer_string().map(str::to_owned),
                serial_number: device.serial_number().map(str::to_owned),
            })
            .collect())
    }

    fn open(&mut self, info: &HidDeviceInfo) -> HidCommonResult<Box<dyn PadTransport>> {
        let path = CString::new(info.path.as_bytes())
            .map_err(|_| HidCommonError::OpenError(format!("bad path: {}", info.path)))?;
        let device = self
            .api
            .open_path(&path)
            .map_err(|e| HidCommonError::OpenError(e.to_string()))?;
        device
            .set_blocking_mode(false)
            .map_err(|e| HidCommonError::OpenError(e.to_string()))?;

        tracing::debug!(path = %info.path, "opened pad transport");
        Ok(Box::new(HidapiTransport {
            device,
            info: info.clone(),
        }))
    }
}

/// Frame a payload with its report ID byte for the feature pipe.
fn frame_report(report_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(1 + payload.len());
    framed.push(report_id);
    framed.extend_from_slice(payload);
    framed
}

struct HidapiTransport {
    device: HidDevice,
    info: HidDeviceInfo,
}

impl PadTransport for HidapiTransport {
    fn read_report(&mut self, report_id: u8, buf: &mut [u8]) -> HidCommonResult<ReadOutcome> {
        let mut raw = vec![0u8; buf.len() + 1];

        if report_id == report_ids::SENSOR_VALUES {
            match self.device.read(&mut raw) {
                Ok(0) => Ok(ReadOutcome::WouldBlock),
                Ok(read) if raw[0] == report_id => {
                    let len = (read - 1).min(buf.len());
                    buf[..len].copy_from_slice(&raw[1..1 + len]);
                    Ok(ReadOutcome::Data(len))
                }
                // Some other input report (e.g. the joystick interface);
                // not ours, not an error.
                Ok(_) => Ok(ReadOutcome::WouldBlock),
                Err(e) => Err(HidCommonError::ReadError(e.to_string())),
            }
        } else {
            raw[0] = report_id;
            match self.device.get_feature_report(&mut raw) {
                Ok(read) if read > 1 && raw[0] == report_id => {
                    let len = (read - 1).min(buf.len());
                    buf[..len].copy_from_slice(&raw[1..1 + len]);
                    Ok(ReadOutcome::Data(len))
                }
                Ok(read) => Err(HidCommonError::ReadError(format!(
                    "short feature report 0x{report_id:02X}: {read} bytes"
                ))),
                Err(e) => Err(HidCommonError::ReadError(e.to_string())),
            }
        }
    }

    fn write_report(&mut self, report_id: u8, payload: &[u8]) -> HidCommonResult<usize> {
        let framed = frame_report(report_id, payload);
        self.device
            .send_feature_report(&framed)
            .map_err(|e| HidCommonError::WriteError(e.to_string()))?;
        Ok(payload.len())
    }

    fn info(&self) -> &HidDeviceInfo {
        &self.info
    }
}
