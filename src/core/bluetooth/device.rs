//! Bluetooth device representation and related functionality

use std::sync::LazyLock;

use regex::Regex;

use crate::core::bluetooth::constants::MAC_ADDRESS_PATTERN;

static MAC_ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MAC_ADDRESS_PATTERN).expect("MAC address pattern is valid"));

/// A device reported by one discovery broadcast.
///
/// Hosts build one of these per found-device event. Any field may be missing;
/// the scanner decides what is forwarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// The name of the device, if the platform resolved one
    pub name: Option<String>,
    /// User-assigned or advertised alias
    pub alias: Option<String>,
    /// The hardware address (MAC) of the device
    pub address: Option<String>,
}

impl DiscoveredDevice {
    /// Creates a new DiscoveredDevice instance
    pub fn new(name: Option<String>, alias: Option<String>, address: Option<String>) -> Self {
        Self {
            name,
            alias,
            address,
        }
    }

    /// Shorthand for a device with both a name and an address
    pub fn named(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self::new(Some(name.into()), None, Some(address.into()))
    }
}

/// Pulls the last MAC address out of a platform device id, upper-cased.
pub fn extract_mac_address(device_id: &str) -> Option<String> {
    MAC_ADDRESS_RE
        .find_iter(device_id)
        .last()
        .map(|m| m.as_str().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_address_from_bluez_path() {
        let id = "/org/bluez/hci0/dev_aa-bb-cc-dd-ee-ff";
        assert_eq!(extract_mac_address(id), Some("AA-BB-CC-DD-EE-FF".to_string()));
    }

    #[test]
    fn extracts_last_address_from_windows_id() {
        let id = "BluetoothLE#BluetoothLE00:1a:7d:da:71:13-a4:c1:38:12:34:56";
        assert_eq!(extract_mac_address(id), Some("A4:C1:38:12:34:56".to_string()));
    }

    #[test]
    fn opaque_ids_have_no_address() {
        assert_eq!(extract_mac_address("8E7A1F0C-3B64-4F2E-9D1B-0A2C4E6F8101"), None);
    }
}
