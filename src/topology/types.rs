//! Topology type definitions.
//!
//! This file contains the small enumerations shared by ports and elements:
//! the port medium, the link state and the simulated device type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical medium of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMedium {
    /// Wavelength-specific optical port (DWDM, OTN line side)
    Optical,
    /// Client-side electrical port (Ethernet)
    Electrical,
    /// Management / OAM port
    Control,
    /// Sub-wavelength tributary
    Tributary,
}

impl PortMedium {
    /// Returns a string representation of the medium
    pub fn as_str(&self) -> &'static str {
        match self {
            PortMedium::Optical => "optical",
            PortMedium::Electrical => "electrical",
            PortMedium::Control => "control",
            PortMedium::Tributary => "tributary",
        }
    }
}

impl fmt::Display for PortMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link state of a port as reported to management callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Available,
    Connected,
    Down,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Available => "available",
            LinkState::Connected => "connected",
            LinkState::Down => "down",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of simulated network element.
///
/// Labels are matched case-insensitively, so `TRANSPONDER` and `transponder`
/// name the same device type. Unrecognised labels are kept verbatim in
/// [`DeviceType::Other`] and get the generic port layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Transponder,
    Amplifier,
    Switch,
    CrossConnect,
    Other(String),
}

impl DeviceType {
    /// Parse a device type label
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "transponder" => DeviceType::Transponder,
            "amplifier" => DeviceType::Amplifier,
            "switch" => DeviceType::Switch,
            "cross-connect" => DeviceType::CrossConnect,
            _ => DeviceType::Other(label.trim().to_string()),
        }
    }

    /// Canonical label (lowercase for the known types)
    pub fn label(&self) -> &str {
        match self {
            DeviceType::Transponder => "transponder",
            DeviceType::Amplifier => "amplifier",
            DeviceType::Switch => "switch",
            DeviceType::CrossConnect => "cross-connect",
            DeviceType::Other(label) => label,
        }
    }

    /// Number of interfaces an element of this type reports over the
    /// management session. Independent of the port template.
    pub fn interface_count(&self) -> usize {
        match self {
            DeviceType::Transponder => 10,
            DeviceType::Amplifier => 4,
            DeviceType::Switch => 32,
            DeviceType::CrossConnect => 16,
            DeviceType::Other(_) => 8,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DeviceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_labels_are_case_insensitive() {
        assert_eq!(DeviceType::from_label("TRANSPONDER"), DeviceType::Transponder);
        assert_eq!(DeviceType::from_label("Amplifier"), DeviceType::Amplifier);
        assert_eq!(DeviceType::from_label("switch"), DeviceType::Switch);
        assert_eq!(DeviceType::from_label("CROSS-CONNECT"), DeviceType::CrossConnect);
        assert_eq!(
            DeviceType::from_label("Multiplexer"),
            DeviceType::Other("Multiplexer".to_string())
        );
    }

    #[test]
    fn test_interface_counts() {
        assert_eq!(DeviceType::Transponder.interface_count(), 10);
        assert_eq!(DeviceType::Amplifier.interface_count(), 4);
        assert_eq!(DeviceType::Switch.interface_count(), 32);
        assert_eq!(DeviceType::CrossConnect.interface_count(), 16);
        assert_eq!(DeviceType::Other("roadm".into()).interface_count(), 8);
    }

    #[test]
    fn test_serialized_forms() {
        assert_eq!(serde_json::to_string(&PortMedium::Optical).unwrap(), "\"optical\"");
        assert_eq!(serde_json::to_string(&LinkState::Connected).unwrap(), "\"connected\"");
        assert_eq!(serde_json::to_string(&DeviceType::CrossConnect).unwrap(), "\"cross-connect\"");
    }
}
