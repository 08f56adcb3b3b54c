//! Port values.
//!
//! A [`Port`] is an immutable snapshot of one connection point on an element.
//! Link establishment and teardown never edit a port in place: they build a
//! replacement value that the owning element stores under the same id.

use super::types::{LinkState, PortMedium};

/// Receive power reported by a port with no incoming signal (dBm).
pub const NO_SIGNAL_DBM: f64 = -99.0;

/// Extra loss applied to the return direction of a patched link (dB).
///
/// This is a modelling simplification for connector insertion loss, not a
/// measured effect: the far end of a link sees `tx - degradation`, the near end
/// sees that value minus this constant.
pub const RETURN_PATH_LOSS_DB: f64 = 0.5;

/// The far side of a patched port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEndpoint {
    pub element_id: String,
    pub port_id: String,
}

impl RemoteEndpoint {
    pub fn new(element_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            port_id: port_id.into(),
        }
    }

    /// Returns true if this endpoint names the given element and port
    pub fn is(&self, element_id: &str, port_id: &str) -> bool {
        self.element_id == element_id && self.port_id == port_id
    }
}

/// One connection point on a simulated element.
///
/// The link state is derived from the remote endpoint, so a port is
/// `connected` exactly when it knows both the remote element and remote port.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    id: String,
    name: String,
    medium: PortMedium,
    remote: Option<RemoteEndpoint>,
    tx_power_dbm: f64,
    rx_power_dbm: f64,
    wavelength: Option<String>,
}

impl Port {
    /// Create an unconnected optical port
    pub fn optical(
        id: impl Into<String>,
        name: impl Into<String>,
        tx_power_dbm: f64,
        wavelength: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            medium: PortMedium::Optical,
            remote: None,
            tx_power_dbm,
            rx_power_dbm: NO_SIGNAL_DBM,
            wavelength: Some(wavelength.into()),
        }
    }

    /// Create an unconnected electrical (client) port.
    ///
    /// Transmit power carries no meaning for electrical ports and is 0.0.
    pub fn electrical(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            medium: PortMedium::Electrical,
            remote: None,
            tx_power_dbm: 0.0,
            rx_power_dbm: NO_SIGNAL_DBM,
            wavelength: None,
        }
    }

    /// Connected copy of this port, receiving `rx_power_dbm` from the remote end
    pub fn with_link(&self, remote: RemoteEndpoint, rx_power_dbm: f64) -> Self {
        Self {
            remote: Some(remote),
            rx_power_dbm,
            ..self.clone()
        }
    }

    /// Unconnected copy of this port
    pub fn without_link(&self) -> Self {
        Self {
            remote: None,
            rx_power_dbm: NO_SIGNAL_DBM,
            ..self.clone()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn medium(&self) -> PortMedium {
        self.medium
    }

    pub fn link_state(&self) -> LinkState {
        if self.remote.is_some() {
            LinkState::Connected
        } else {
            LinkState::Available
        }
    }

    pub fn is_connected(&self) -> bool {
        self.remote.is_some()
    }

    pub fn remote(&self) -> Option<&RemoteEndpoint> {
        self.remote.as_ref()
    }

    /// Returns true if this port is patched to the given remote port
    pub fn is_linked_to(&self, element_id: &str, port_id: &str) -> bool {
        self.remote
            .as_ref()
            .map_or(false, |remote| remote.is(element_id, port_id))
    }

    pub fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    pub fn rx_power_dbm(&self) -> f64 {
        self.rx_power_dbm
    }

    pub fn wavelength(&self) -> Option<&str> {
        self.wavelength.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ports_have_no_signal() {
        let optical = Port::optical("optical-tx", "Line TX", -8.0, "1550.12nm");
        assert_eq!(optical.link_state(), LinkState::Available);
        assert_eq!(optical.rx_power_dbm(), NO_SIGNAL_DBM);
        assert_eq!(optical.tx_power_dbm(), -8.0);
        assert_eq!(optical.wavelength(), Some("1550.12nm"));

        let electrical = Port::electrical("eth1", "Client Interface 1");
        assert_eq!(electrical.medium(), PortMedium::Electrical);
        assert_eq!(electrical.rx_power_dbm(), NO_SIGNAL_DBM);
        assert_eq!(electrical.wavelength(), None);
        assert!(electrical.remote().is_none());
    }

    #[test]
    fn test_with_link_replaces_rather_than_mutates() {
        let port = Port::optical("input-1", "Input Port 1", -20.0, "C-Band");
        let linked = port.with_link(RemoteEndpoint::new("OTN-TXP-NYC-001", "optical-tx"), -24.0);

        assert!(!port.is_connected());
        assert!(linked.is_connected());
        assert_eq!(linked.link_state(), LinkState::Connected);
        assert!(linked.is_linked_to("OTN-TXP-NYC-001", "optical-tx"));
        assert_eq!(linked.rx_power_dbm(), -24.0);
        assert_eq!(linked.tx_power_dbm(), -20.0);
        assert_eq!(linked.id(), port.id());
    }

    #[test]
    fn test_without_link_restores_sentinel() {
        let port = Port::optical("output-1", "Output Port 1", 17.0, "C-Band")
            .with_link(RemoteEndpoint::new("EDFA-BOS-001", "input-1"), 1.0);
        let unlinked = port.without_link();

        assert_eq!(unlinked.link_state(), LinkState::Available);
        assert_eq!(unlinked.rx_power_dbm(), NO_SIGNAL_DBM);
        assert!(unlinked.remote().is_none());
        assert_eq!(unlinked, Port::optical("output-1", "Output Port 1", 17.0, "C-Band"));
    }
}
