//! The topology graph.
//!
//! [`Topology`] owns every element and the list of active links, and is the
//! only entry point for structural changes. All state sits behind one
//! `parking_lot::RwLock`: a connect resolves both elements, installs both
//! replacement ports and records the link inside a single write section, so a
//! reader can never observe a link whose ports are not yet connected.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::element::ElementNode;
use super::port::RemoteEndpoint;
use super::types::DeviceType;
use crate::utils::validation::is_valid_identifier;

/// What a connect does when one of the named ports is already patched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectPolicy {
    /// Refuse with [`TopologyError::PortInUse`]
    #[default]
    Reject,
    /// Last writer wins: the two named ports are re-patched, earlier peers and
    /// link records are left as they were
    Overwrite,
}

/// Errors returned by topology operations.
///
/// None of these are faults: they report absent entities or refused requests
/// and leave the graph unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("network element '{0}' not found")]
    ElementNotFound(String),
    #[error("port '{port}' not found on network element '{element}'")]
    PortNotFound { element: String, port: String },
    #[error("port {element}:{port} is already connected")]
    PortInUse { element: String, port: String },
    #[error("port {element}:{port} is not connected")]
    PortNotConnected { element: String, port: String },
    #[error("port {element}:{port} cannot be patched to itself")]
    LoopbackPort { element: String, port: String },
    #[error("network element '{0}' is already registered")]
    DuplicateElement(String),
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("invalid degradation {0} dB: must be finite and non-negative")]
    InvalidDegradation(f64),
}

/// A recorded, degradation-annotated edge between two ports.
///
/// The port state on both elements is authoritative; links are the audit trail
/// used for topology introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub from_element: String,
    pub from_port: String,
    pub to_element: String,
    pub to_port: String,
    pub degradation_db: f64,
}

impl Link {
    /// Returns true if either end of the link is the given port
    pub fn touches(&self, element_id: &str, port_id: &str) -> bool {
        (self.from_element == element_id && self.from_port == port_id)
            || (self.to_element == element_id && self.to_port == port_id)
    }

    /// `element:port` form of the source end
    pub fn from_endpoint(&self) -> String {
        format!("{}:{}", self.from_element, self.from_port)
    }

    /// `element:port` form of the destination end
    pub fn to_endpoint(&self) -> String {
        format!("{}:{}", self.to_element, self.to_port)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({} dB)", self.from_endpoint(), self.to_endpoint(), self.degradation_db)
    }
}

/// Elements and links captured under one read lock
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    /// Elements ordered by id
    pub elements: Vec<ElementNode>,
    /// Links in the order they were established
    pub links: Vec<Link>,
}

#[derive(Debug, Default)]
struct GraphState {
    elements: HashMap<String, ElementNode>,
    links: Vec<Link>,
    policy: ConnectPolicy,
}

/// Shared, thread-safe network topology
#[derive(Debug, Default)]
pub struct Topology {
    state: RwLock<GraphState>,
}

impl Topology {
    /// Empty topology with the [`ConnectPolicy::Reject`] policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConnectPolicy) -> Self {
        let topology = Self::default();
        topology.set_connect_policy(policy);
        topology
    }

    pub fn connect_policy(&self) -> ConnectPolicy {
        self.state.read().policy
    }

    pub fn set_connect_policy(&self, policy: ConnectPolicy) {
        self.state.write().policy = policy;
    }

    /// Register a new element built from its device-type template
    pub fn add_element(&self, element_id: &str, device_type: &str, location: &str) -> Result<(), TopologyError> {
        if !is_valid_identifier(element_id) {
            return Err(TopologyError::InvalidIdentifier(element_id.to_string()));
        }

        let mut state = self.state.write();
        if state.elements.contains_key(element_id) {
            return Err(TopologyError::DuplicateElement(element_id.to_string()));
        }

        let node = ElementNode::new(element_id, DeviceType::from_label(device_type), location);
        log::debug!(
            "Registered {} '{}' at {} with {} ports",
            node.device_type(),
            element_id,
            location,
            node.port_count()
        );
        state.elements.insert(element_id.to_string(), node);
        Ok(())
    }

    /// Patch `from_element:from_port` to `to_element:to_port`.
    ///
    /// Both ports are replaced with their connected form and a [`Link`] is
    /// recorded, all under one write lock.
    pub fn connect(
        &self,
        from_element: &str,
        from_port: &str,
        to_element: &str,
        to_port: &str,
        degradation_db: f64,
    ) -> Result<Link, TopologyError> {
        if !degradation_db.is_finite() || degradation_db < 0.0 {
            return Err(TopologyError::InvalidDegradation(degradation_db));
        }

        let mut guard = self.state.write();
        let state = &mut *guard;

        let from = state
            .elements
            .get(from_element)
            .ok_or_else(|| TopologyError::ElementNotFound(from_element.to_string()))?;
        let to = state
            .elements
            .get(to_element)
            .ok_or_else(|| TopologyError::ElementNotFound(to_element.to_string()))?;
        let plan = from.plan_link(from_port, to, to_port, degradation_db, state.policy)?;

        let now = Utc::now();
        if let Some(node) = state.elements.get_mut(from_element) {
            node.install(plan.local, now);
        }
        if let Some(node) = state.elements.get_mut(to_element) {
            node.install(plan.remote, now);
        }

        let link = Link {
            from_element: from_element.to_string(),
            from_port: from_port.to_string(),
            to_element: to_element.to_string(),
            to_port: to_port.to_string(),
            degradation_db,
        };
        log::debug!("Connected {}", link);
        state.links.push(link.clone());
        Ok(link)
    }

    /// Tear down the link on `element_id:port_id`.
    ///
    /// The far end is released as well when it still points back at this
    /// port, and every link touching a released port is dropped.
    pub fn disconnect(&self, element_id: &str, port_id: &str) -> Result<(), TopologyError> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = Utc::now();

        let node = state
            .elements
            .get_mut(element_id)
            .ok_or_else(|| TopologyError::ElementNotFound(element_id.to_string()))?;
        let peer = node.release(port_id, now)?;

        let local = RemoteEndpoint::new(element_id, port_id);
        let peer_released = state
            .elements
            .get_mut(&peer.element_id)
            .map_or(false, |node| node.release_if_linked_to(&peer.port_id, &local, now));

        state.links.retain(|link| {
            !(link.touches(element_id, port_id)
                || (peer_released && link.touches(&peer.element_id, &peer.port_id)))
        });

        log::debug!(
            "Disconnected {}:{} (peer {}:{} {})",
            element_id,
            port_id,
            peer.element_id,
            peer.port_id,
            if peer_released { "released" } else { "left as is" }
        );
        Ok(())
    }

    /// Refresh an element's last-activity timestamp
    pub fn touch(&self, element_id: &str) -> Result<(), TopologyError> {
        let mut state = self.state.write();
        let node = state
            .elements
            .get_mut(element_id)
            .ok_or_else(|| TopologyError::ElementNotFound(element_id.to_string()))?;
        node.touch(Utc::now());
        Ok(())
    }

    /// Snapshot of one element
    pub fn get_element(&self, element_id: &str) -> Option<ElementNode> {
        self.state.read().elements.get(element_id).cloned()
    }

    /// Snapshot of all elements, ordered by id
    pub fn list_elements(&self) -> Vec<ElementNode> {
        let state = self.state.read();
        sorted_elements(&state)
    }

    pub fn list_links(&self) -> Vec<Link> {
        self.state.read().links.clone()
    }

    /// Number of registered elements
    pub fn count(&self) -> usize {
        self.state.read().elements.len()
    }

    pub fn link_count(&self) -> usize {
        self.state.read().links.len()
    }

    /// Elements and links as one consistent view
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.read();
        GraphSnapshot {
            elements: sorted_elements(&state),
            links: state.links.clone(),
        }
    }
}

fn sorted_elements(state: &GraphState) -> Vec<ElementNode> {
    let mut elements: Vec<ElementNode> = state.elements.values().cloned().collect();
    elements.sort_by(|a, b| a.id().cmp(b.id()));
    elements
}
