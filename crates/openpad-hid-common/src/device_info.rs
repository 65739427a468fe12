//! Enumeration record for a candidate HID device.

use hid_pad_protocol::SUPPORTED_HID_IDS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub path: String,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
}

impl HidDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            product: None,
            manufacturer: None,
            serial_number: None,
        }
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Whether this device is on the pad vendor/product allowlist.
    pub fn is_supported_pad(&self) -> bool {
        SUPPORTED_HID_IDS.contains(&(self.vendor_id, self.product_id))
    }

    /// Best human-readable label for logs and the failure denylist.
    pub fn display_name(&self) -> Option<String> {
        self.product
            .clone()
            .or_else(|| self.manufacturer.clone())
    }
}
