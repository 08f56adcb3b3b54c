//! Simulated network elements.
//!
//! An [`ElementNode`] owns the ports of one simulated device. Its port set is
//! fixed by the device-type template at construction; afterwards ports are only
//! ever replaced, one value at a time, by the link operations below.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::graph::{ConnectPolicy, TopologyError};
use super::port::{Port, RemoteEndpoint, RETURN_PATH_LOSS_DB};
use super::types::DeviceType;

/// Replacement ports for both ends of a link that is about to be established.
///
/// Produced by [`ElementNode::plan_link`] without touching either element, so
/// the caller can install both halves under a single write lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPlan {
    pub local: Port,
    pub remote: Port,
}

/// A simulated device and its ports
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    id: String,
    device_type: DeviceType,
    location: String,
    ports: BTreeMap<String, Port>,
    last_activity: DateTime<Utc>,
}

impl ElementNode {
    /// Build an element with the canonical port layout for its device type
    pub fn new(id: impl Into<String>, device_type: DeviceType, location: impl Into<String>) -> Self {
        let ports = template_ports(&device_type)
            .into_iter()
            .map(|port| (port.id().to_string(), port))
            .collect();

        Self {
            id: id.into(),
            device_type,
            location: location.into(),
            ports,
            last_activity: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device_type(&self) -> &DeviceType {
        &self.device_type
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.ports.get(port_id)
    }

    /// All ports, ordered by port id
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn connected_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(|port| port.is_connected())
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn connected_port_count(&self) -> usize {
        self.connected_ports().count()
    }

    /// Work out the replacement ports for patching `local_port_id` on this
    /// element to `remote_port_id` on `remote`.
    ///
    /// The far end receives `tx - degradation_db`; the near end receives that
    /// value minus [`RETURN_PATH_LOSS_DB`]. `remote` may be this element when
    /// two of its own ports are patched together.
    pub fn plan_link(
        &self,
        local_port_id: &str,
        remote: &ElementNode,
        remote_port_id: &str,
        degradation_db: f64,
        policy: ConnectPolicy,
    ) -> Result<LinkPlan, TopologyError> {
        let local_port = self.port(local_port_id).ok_or_else(|| TopologyError::PortNotFound {
            element: self.id.clone(),
            port: local_port_id.to_string(),
        })?;
        let remote_port = remote.port(remote_port_id).ok_or_else(|| TopologyError::PortNotFound {
            element: remote.id.clone(),
            port: remote_port_id.to_string(),
        })?;

        if self.id == remote.id && local_port_id == remote_port_id {
            return Err(TopologyError::LoopbackPort {
                element: self.id.clone(),
                port: local_port_id.to_string(),
            });
        }

        if policy == ConnectPolicy::Reject {
            for (element, port) in [(self, local_port), (remote, remote_port)] {
                if port.is_connected() {
                    return Err(TopologyError::PortInUse {
                        element: element.id.clone(),
                        port: port.id().to_string(),
                    });
                }
            }
        }

        let far_end_rx = local_port.tx_power_dbm() - degradation_db;
        let near_end_rx = far_end_rx - RETURN_PATH_LOSS_DB;

        Ok(LinkPlan {
            local: local_port.with_link(RemoteEndpoint::new(&remote.id, remote_port_id), near_end_rx),
            remote: remote_port.with_link(RemoteEndpoint::new(&self.id, local_port_id), far_end_rx),
        })
    }

    /// Store a replacement port value under its id.
    ///
    /// Ports not in the template are ignored; the port set never grows.
    pub(super) fn install(&mut self, port: Port, at: DateTime<Utc>) {
        if let Some(slot) = self.ports.get_mut(port.id()) {
            *slot = port;
            self.last_activity = at;
        }
    }

    /// Tear down the link on `port_id`, returning the endpoint it pointed at
    pub(super) fn release(&mut self, port_id: &str, at: DateTime<Utc>) -> Result<RemoteEndpoint, TopologyError> {
        let port = self.port(port_id).ok_or_else(|| TopologyError::PortNotFound {
            element: self.id.clone(),
            port: port_id.to_string(),
        })?;
        let remote = port.remote().cloned().ok_or_else(|| TopologyError::PortNotConnected {
            element: self.id.clone(),
            port: port_id.to_string(),
        })?;

        let unlinked = port.without_link();
        self.install(unlinked, at);
        Ok(remote)
    }

    /// Tear down `port_id` only if it still points at the given endpoint.
    /// Returns true if the port was released.
    pub(super) fn release_if_linked_to(
        &mut self,
        port_id: &str,
        peer: &RemoteEndpoint,
        at: DateTime<Utc>,
    ) -> bool {
        match self.port(port_id) {
            Some(port) if port.is_linked_to(&peer.element_id, &peer.port_id) => {
                let unlinked = port.without_link();
                self.install(unlinked, at);
                true
            }
            _ => false,
        }
    }

    pub(super) fn touch(&mut self, at: DateTime<Utc>) {
        self.last_activity = at;
    }
}

/// Canonical port layout for each device type
fn template_ports(device_type: &DeviceType) -> Vec<Port> {
    match device_type {
        DeviceType::Transponder => vec![
            Port::electrical("eth1", "Client Interface 1"),
            Port::electrical("eth2", "Client Interface 2"),
            Port::optical("optical-tx", "Line TX", -8.0, "1550.12nm"),
            Port::optical("optical-rx", "Line RX", 0.0, "1550.12nm"),
        ],
        // Two EDFA stages, each an input/output pair
        DeviceType::Amplifier => vec![
            Port::optical("input-1", "Input Port 1", -20.0, "C-Band"),
            Port::optical("output-1", "Output Port 1", 17.0, "C-Band"),
            Port::optical("input-2", "Input Port 2", -18.0, "C-Band"),
            Port::optical("output-2", "Output Port 2", 18.0, "C-Band"),
        ],
        DeviceType::Switch => (1..=8)
            .map(|i| Port::optical(format!("port-{}", i), format!("Optical Port {}", i), -5.0, "Variable"))
            .collect(),
        DeviceType::CrossConnect => (1..=4)
            .map(|i| {
                Port::optical(
                    format!("wavelength-{}", i),
                    format!("Wavelength Channel {}", i),
                    0.0,
                    format!("155{}.nm", 50 + i),
                )
            })
            .collect(),
        DeviceType::Other(_) => (1..=4)
            .flat_map(|i| {
                [
                    Port::electrical(format!("eth{}", i), format!("Ethernet {}", i)),
                    Port::optical(format!("optical-{}", i), format!("Optical {}", i), -8.0, "Variable"),
                ]
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::port::NO_SIGNAL_DBM;
    use crate::topology::types::{LinkState, PortMedium};

    fn port_ids(element: &ElementNode) -> Vec<&str> {
        element.ports().map(|port| port.id()).collect()
    }

    #[test]
    fn test_transponder_template() {
        let txp = ElementNode::new("OTN-TXP-NYC-001", DeviceType::Transponder, "New York DataCenter");
        assert_eq!(port_ids(&txp), vec!["eth1", "eth2", "optical-rx", "optical-tx"]);
        assert_eq!(txp.port("eth1").unwrap().medium(), PortMedium::Electrical);
        assert_eq!(txp.port("optical-tx").unwrap().tx_power_dbm(), -8.0);
        assert_eq!(txp.port("optical-rx").unwrap().wavelength(), Some("1550.12nm"));
    }

    #[test]
    fn test_amplifier_switch_and_cross_connect_templates() {
        let amp = ElementNode::new("EDFA-1", DeviceType::Amplifier, "Span");
        assert_eq!(port_ids(&amp), vec!["input-1", "input-2", "output-1", "output-2"]);
        assert_eq!(amp.port("output-2").unwrap().tx_power_dbm(), 18.0);

        let switch = ElementNode::new("SW-1", DeviceType::Switch, "Lab");
        assert_eq!(switch.port_count(), 8);
        assert_eq!(switch.port("port-8").unwrap().name(), "Optical Port 8");

        let oxc = ElementNode::new("OXC-1", DeviceType::CrossConnect, "Hub");
        assert_eq!(oxc.port_count(), 4);
        assert_eq!(oxc.port("wavelength-1").unwrap().wavelength(), Some("15551.nm"));
        assert_eq!(oxc.port("wavelength-4").unwrap().wavelength(), Some("15554.nm"));
    }

    #[test]
    fn test_unknown_type_gets_generic_ports() {
        let node = ElementNode::new("MUX-1", DeviceType::from_label("multiplexer"), "Metro");
        assert_eq!(node.port_count(), 8);
        assert_eq!(node.port("eth4").unwrap().medium(), PortMedium::Electrical);
        assert_eq!(node.port("optical-3").unwrap().tx_power_dbm(), -8.0);
        assert!(node.ports().all(|port| port.rx_power_dbm() == NO_SIGNAL_DBM));
    }

    #[test]
    fn test_plan_link_power_budget() {
        let txp = ElementNode::new("TXP", DeviceType::Transponder, "A");
        let amp = ElementNode::new("AMP", DeviceType::Amplifier, "B");

        let plan = txp
            .plan_link("optical-tx", &amp, "input-1", 16.0, ConnectPolicy::Reject)
            .unwrap();

        assert_eq!(plan.remote.rx_power_dbm(), -24.0);
        assert_eq!(plan.local.rx_power_dbm(), -24.5);
        assert!(plan.local.is_linked_to("AMP", "input-1"));
        assert!(plan.remote.is_linked_to("TXP", "optical-tx"));

        // Planning leaves both elements untouched
        assert!(!txp.port("optical-tx").unwrap().is_connected());
        assert!(!amp.port("input-1").unwrap().is_connected());
    }

    #[test]
    fn test_plan_link_missing_ports() {
        let txp = ElementNode::new("TXP", DeviceType::Transponder, "A");
        let amp = ElementNode::new("AMP", DeviceType::Amplifier, "B");

        assert_eq!(
            txp.plan_link("optical-9", &amp, "input-1", 1.0, ConnectPolicy::Reject),
            Err(TopologyError::PortNotFound { element: "TXP".into(), port: "optical-9".into() })
        );
        assert_eq!(
            txp.plan_link("optical-tx", &amp, "input-9", 1.0, ConnectPolicy::Reject),
            Err(TopologyError::PortNotFound { element: "AMP".into(), port: "input-9".into() })
        );
    }

    #[test]
    fn test_plan_link_rejects_busy_port_under_reject_policy() {
        let mut txp = ElementNode::new("TXP", DeviceType::Transponder, "A");
        let amp = ElementNode::new("AMP", DeviceType::Amplifier, "B");
        let plan = txp.plan_link("optical-tx", &amp, "input-1", 2.0, ConnectPolicy::Reject).unwrap();
        txp.install(plan.local, Utc::now());

        assert_eq!(
            txp.plan_link("optical-tx", &amp, "input-2", 2.0, ConnectPolicy::Reject),
            Err(TopologyError::PortInUse { element: "TXP".into(), port: "optical-tx".into() })
        );
        assert!(txp.plan_link("optical-tx", &amp, "input-2", 2.0, ConnectPolicy::Overwrite).is_ok());
    }

    #[test]
    fn test_loopback_rejected_but_internal_patch_allowed() {
        let switch = ElementNode::new("SW", DeviceType::Switch, "Lab");
        assert!(matches!(
            switch.plan_link("port-1", &switch, "port-1", 0.0, ConnectPolicy::Overwrite),
            Err(TopologyError::LoopbackPort { .. })
        ));
        let plan = switch.plan_link("port-1", &switch, "port-2", 1.0, ConnectPolicy::Reject).unwrap();
        assert!(plan.local.is_linked_to("SW", "port-2"));
        assert!(plan.remote.is_linked_to("SW", "port-1"));
    }

    #[test]
    fn test_release() {
        let mut txp = ElementNode::new("TXP", DeviceType::Transponder, "A");
        let amp = ElementNode::new("AMP", DeviceType::Amplifier, "B");

        assert!(matches!(txp.release("optical-tx", Utc::now()), Err(TopologyError::PortNotConnected { .. })));
        assert!(matches!(txp.release("nope", Utc::now()), Err(TopologyError::PortNotFound { .. })));

        let plan = txp.plan_link("optical-tx", &amp, "input-1", 2.0, ConnectPolicy::Reject).unwrap();
        txp.install(plan.local, Utc::now());
        assert_eq!(txp.connected_port_count(), 1);

        let remote = txp.release("optical-tx", Utc::now()).unwrap();
        assert_eq!(remote, RemoteEndpoint::new("AMP", "input-1"));
        let port = txp.port("optical-tx").unwrap();
        assert_eq!(port.link_state(), LinkState::Available);
        assert_eq!(port.rx_power_dbm(), NO_SIGNAL_DBM);
    }

    #[test]
    fn test_release_if_linked_to_checks_peer() {
        let txp = ElementNode::new("TXP", DeviceType::Transponder, "A");
        let mut amp = ElementNode::new("AMP", DeviceType::Amplifier, "B");
        let plan = txp.plan_link("optical-tx", &amp, "input-1", 2.0, ConnectPolicy::Reject).unwrap();
        amp.install(plan.remote, Utc::now());

        assert!(!amp.release_if_linked_to("input-1", &RemoteEndpoint::new("OTHER", "optical-tx"), Utc::now()));
        assert!(amp.port("input-1").unwrap().is_connected());
        assert!(amp.release_if_linked_to("input-1", &RemoteEndpoint::new("TXP", "optical-tx"), Utc::now()));
        assert!(!amp.port("input-1").unwrap().is_connected());
    }

    #[test]
    fn test_install_ignores_unknown_port_ids() {
        let mut amp = ElementNode::new("AMP", DeviceType::Amplifier, "B");
        amp.install(Port::electrical("eth9", "Stray"), Utc::now());
        assert_eq!(amp.port_count(), 4);
        assert!(amp.port("eth9").is_none());
    }
}
